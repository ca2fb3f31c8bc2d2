// tests/hazards.rs
mod common;

use common::*;
use liquid_robot::atomic;
use liquid_robot::command::{
    Command, ConfigureNozzleLayoutParams, LabwareMovementStrategy, MoveLabwareParams, NozzleLayoutParams,
    ShakeSpeedParams, WellLocation, WellTargetParams,
};
use liquid_robot::compound::{self, AbsorbanceReaderAction, AbsorbanceReaderArgs, ReplaceTipArgs};
use liquid_robot::entities::{EquipmentKind, ModuleModel};
use liquid_robot::robot_state::{LabwareLocation, Mount, NozzleConfiguration};
use liquid_robot::{CommandCreatorResult, ErrorType, InvariantContext, RobotState, RobotType, WarningType};
use pretty_assertions::assert_eq;

fn well_target(pipette: &str, labware: &str, well: &str) -> WellTargetParams {
    WellTargetParams {
        pipette_id: pipette.into(),
        labware_id: labware.into(),
        well_name: well.into(),
        well_location: WellLocation::top(-1.0),
    }
}

/// Error types of a failed creator. `Err` carries no commands.
fn error_types(result: CommandCreatorResult) -> Vec<ErrorType> {
    result.unwrap_err().errors.into_iter().map(|e| e.error_type).collect()
}

fn open_latch(id: &str) -> Command {
    Command::HeaterShakerOpenLatch(module_params(id))
}

fn shake(id: &str) -> Vec<Command> {
    vec![
        Command::HeaterShakerCloseLatch(module_params(id)),
        Command::HeaterShakerSetShakeSpeed(ShakeSpeedParams {
            module_id: id.into(),
            rpm: 500.0,
        }),
    ]
}

fn plate_def() -> liquid_robot::entities::LabwareDefinition {
    grid_def(12, 8, 200.0)
}

// --- Heater-shaker under the target ---

fn heater_shaker_deck() -> (InvariantContext, RobotState) {
    let ctx = with_module_plate(flex_context(), "hs", ModuleModel::HeaterShakerModuleV1, "hsPlate");
    let state = flex_deck()
        .module("hs", "D1")
        .labware("hsPlate", LabwareLocation::Module("hs".into()))
        .build(&ctx);
    (ctx, state)
}

#[test]
fn test_open_latch_blocks_pipetting_into_the_heater_shaker() {
    let (ctx, state) = heater_shaker_deck();
    let state = state.apply_commands(&[open_latch("hs")], &ctx);

    let found = error_types(atomic::move_to_well(&well_target(PIPETTE, "hsPlate", "A1"), &ctx, &state));
    assert_eq!(found, vec![ErrorType::HeaterShakerLatchOpen]);
}

#[test]
fn test_shaking_blocks_pipetting_into_the_heater_shaker() {
    let (ctx, state) = heater_shaker_deck();
    let state = state.apply_commands(&shake("hs"), &ctx);

    let found = error_types(atomic::move_to_well(&well_target(PIPETTE, "hsPlate", "A1"), &ctx, &state));
    assert_eq!(found, vec![ErrorType::HeaterShakerIsShaking]);
}

#[test]
fn test_idle_heater_shaker_with_closed_latch_is_reachable() {
    let (ctx, state) = heater_shaker_deck();
    let state = state.apply_commands(&[Command::HeaterShakerCloseLatch(module_params("hs"))], &ctx);

    let output = atomic::move_to_well(&well_target(PIPETTE, "hsPlate", "A1"), &ctx, &state).unwrap();
    assert_eq!(command_types(&output), vec!["moveToWell"]);
}

#[test]
fn test_shaking_neighbour_blocks_pipetting() {
    let ctx = flex_context().with_module(module("hs", ModuleModel::HeaterShakerModuleV1));
    let state = flex_deck().module("hs", "C3").build(&ctx);
    let state = state.apply_commands(&shake("hs"), &ctx);

    // The plate sits in C2, directly west of the heater-shaker.
    let found = error_types(atomic::move_to_well(&well_target(PIPETTE, PLATE, "A1"), &ctx, &state));
    assert_eq!(found, vec![ErrorType::HeaterShakerNorthSouthEastWestShaking]);
}

// --- OT-2 multi-channel rules ---

const MULTI: &str = "multi";
const SINGLE: &str = "single";

fn ot2_context() -> InvariantContext {
    InvariantContext::new(RobotType::Ot2)
        .with_pipette(pipette(MULTI, "p300_multi_gen2", 8))
        .with_pipette(pipette(SINGLE, "p300_single_gen2", 1))
        .with_labware(labware(TIPRACK, TIPRACK_URI, tiprack_def()))
        .with_labware(labware(PLATE, "opentrons/corning_96_wellplate_360ul_flat/2", plate_def()))
        .with_module(module("hs", ModuleModel::HeaterShakerModuleV1))
}

/// Plate in slot 5 and the tip rack in slot 2, with a heater-shaker in `hs_slot`.
fn ot2_state(ctx: &InvariantContext, hs_slot: &str) -> RobotState {
    RobotState::builder()
        .pipette(MULTI, Mount::Left)
        .pipette(SINGLE, Mount::Right)
        .labware(PLATE, LabwareLocation::Slot("5".into()))
        .labware(TIPRACK, LabwareLocation::Slot("2".into()))
        .module("hs", hs_slot)
        .build(ctx)
}

#[test]
fn test_ot2_east_neighbour_with_open_latch_and_multi_channel() {
    let ctx = ot2_context();
    let state = ot2_state(&ctx, "6").apply_commands(&[open_latch("hs")], &ctx);

    let found = error_types(atomic::move_to_well(&well_target(MULTI, PLATE, "A1"), &ctx, &state));
    assert_eq!(
        found,
        vec![
            ErrorType::HeaterShakerEastWestLatchOpen,
            ErrorType::HeaterShakerEastWestMultiChannel,
        ]
    );

    let found = error_types(atomic::move_to_well(&well_target(SINGLE, PLATE, "A1"), &ctx, &state));
    assert_eq!(found, vec![ErrorType::HeaterShakerEastWestLatchOpen]);
}

#[test]
fn test_ot2_west_neighbour_blocks_multi_channel() {
    let ctx = ot2_context();
    let state = ot2_state(&ctx, "4");

    let found = error_types(atomic::move_to_well(&well_target(MULTI, PLATE, "A1"), &ctx, &state));
    assert_eq!(found, vec![ErrorType::HeaterShakerEastWestMultiChannel]);
    assert!(atomic::move_to_well(&well_target(SINGLE, PLATE, "A1"), &ctx, &state).is_ok());
}

#[test]
fn test_ot2_north_neighbour_blocks_multi_channel_unless_tiprack() {
    let ctx = ot2_context();
    let state = ot2_state(&ctx, "8");

    let found = error_types(atomic::move_to_well(&well_target(MULTI, PLATE, "A1"), &ctx, &state));
    assert_eq!(found, vec![ErrorType::HeaterShakerNorthSouthOfNonTiprackWithMultiChannel]);

    // Tip rack in slot 5 instead, south of the heater-shaker.
    let rack_state = RobotState::builder()
        .pipette(MULTI, Mount::Left)
        .labware(TIPRACK, LabwareLocation::Slot("5".into()))
        .module("hs", "8")
        .build(&ctx);
    assert!(atomic::move_to_well(&well_target(MULTI, TIPRACK, "A1"), &ctx, &rack_state).is_ok());
}

#[test]
fn test_flex_ignores_ot2_neighbour_rules() {
    let ctx = flex_context()
        .with_pipette(pipette(MULTI, "p1000_multi_flex", 8))
        .with_module(module("hs", ModuleModel::HeaterShakerModuleV1));
    let state = flex_deck()
        .pipette(MULTI, Mount::Right)
        .module("hs", "C3")
        .build(&ctx)
        .apply_commands(&[open_latch("hs")], &ctx);

    assert!(atomic::move_to_well(&well_target(MULTI, PLATE, "A1"), &ctx, &state).is_ok());
}

#[test]
fn test_gen1_multi_channel_over_old_module_in_corner_slot() {
    let ctx = with_module_plate(
        InvariantContext::new(RobotType::Ot2)
            .with_pipette(pipette("gen1", "p300_multi", 8))
            .with_pipette(pipette("gen2", "p300_multi_gen2", 8)),
        "temp",
        ModuleModel::TemperatureModuleV1,
        "tempPlate",
    );
    let state = RobotState::builder()
        .pipette("gen1", Mount::Left)
        .pipette("gen2", Mount::Right)
        .module("temp", "1")
        .labware("tempPlate", LabwareLocation::Module("temp".into()))
        .build(&ctx);

    let found = error_types(atomic::move_to_well(&well_target("gen1", "tempPlate", "A1"), &ctx, &state));
    assert_eq!(found, vec![ErrorType::ModulePipetteCollisionDanger]);
    assert!(atomic::move_to_well(&well_target("gen2", "tempPlate", "A1"), &ctx, &state).is_ok());
}

// --- Flex deck positions ---

#[test]
fn test_column_4_is_out_of_reach() {
    let ctx = flex_context();
    let state = RobotState::builder()
        .pipette(PIPETTE, Mount::Left)
        .labware(PLATE, LabwareLocation::Slot("B4".into()))
        .build(&ctx);

    let found = error_types(atomic::move_to_well(&well_target(PIPETTE, PLATE, "A1"), &ctx, &state));
    assert_eq!(found, vec![ErrorType::PipettingIntoColumn4]);
}

// --- 96-channel head ---

const HEAD: &str = "p96";
const ADAPTER: &str = "adapter";

fn head_context() -> InvariantContext {
    InvariantContext::new(RobotType::Flex)
        .with_pipette(pipette(HEAD, "p1000_96", 96))
        .with_labware(labware(TIPRACK, TIPRACK_URI, tiprack_def()))
        .with_labware(labware(ADAPTER, "opentrons/opentrons_flex_96_tiprack_adapter/1", grid_def(1, 1, 0.0)))
        .with_labware(labware(PLATE, "opentrons/nest_96_wellplate_200ul_flat/2", plate_def()))
        .with_module(module("temp", ModuleModel::TemperatureModuleV2))
        .with_equipment(equipment(TRASH, EquipmentKind::TrashBin, Some("A3")))
}

fn column_layout() -> Command {
    Command::ConfigureNozzleLayout(ConfigureNozzleLayoutParams {
        pipette_id: HEAD.into(),
        configuration_params: NozzleLayoutParams {
            style: NozzleConfiguration::Column,
            primary_nozzle: Some("A12".into()),
        },
    })
}

#[test]
fn test_column_mode_head_clips_tall_module_next_door() {
    let ctx = head_context();
    let state = RobotState::builder()
        .pipette(HEAD, Mount::Left)
        .labware(PLATE, LabwareLocation::Slot("C2".into()))
        .module("temp", "C1")
        .build(&ctx);

    // Full head: no sweep over the neighbouring slot.
    assert!(atomic::move_to_well(&well_target(HEAD, PLATE, "A1"), &ctx, &state).is_ok());

    let column = state.apply_commands(&[column_layout()], &ctx);
    let found = error_types(atomic::move_to_well(&well_target(HEAD, PLATE, "A1"), &ctx, &column));
    assert_eq!(found, vec![ErrorType::PossiblePipetteCollision]);
}

fn replace_with(nozzles: NozzleConfiguration) -> ReplaceTipArgs {
    ReplaceTipArgs {
        pipette_id: HEAD.into(),
        tiprack: None,
        drop_tip_location: TRASH.into(),
        nozzles: Some(nozzles),
    }
}

#[test]
fn test_full_head_pickup_needs_an_adapter() {
    let ctx = head_context();
    let state = RobotState::builder()
        .pipette(HEAD, Mount::Left)
        .labware(TIPRACK, LabwareLocation::Slot("B2".into()))
        .build(&ctx);

    let found = error_types(compound::replace_tip(&replace_with(NozzleConfiguration::All), &ctx, &state));
    assert_eq!(found, vec![ErrorType::MissingAdapter]);
}

#[test]
fn test_column_pickup_rejects_an_adapter() {
    let ctx = head_context();
    let state = RobotState::builder()
        .pipette(HEAD, Mount::Left)
        .labware(ADAPTER, LabwareLocation::Slot("B2".into()))
        .labware(TIPRACK, LabwareLocation::Labware(ADAPTER.into()))
        .build(&ctx);

    let found = error_types(compound::replace_tip(&replace_with(NozzleConfiguration::Column), &ctx, &state));
    assert_eq!(found, vec![ErrorType::RemoveAdapter]);

    let output = compound::replace_tip(&replace_with(NozzleConfiguration::All), &ctx, &state).unwrap();
    assert_eq!(command_types(&output), vec!["pickUpTip"]);
}

// --- Absorbance reader lid ---

#[test]
fn test_reader_lid_needs_a_gripper() {
    let mut ctx = flex_context().with_module(module("reader", ModuleModel::AbsorbanceReaderV1));
    ctx.additional_equipment_entities.shift_remove("gripper");
    let state = flex_deck().module("reader", "D3").build(&ctx);

    for open in [true, false] {
        let args = AbsorbanceReaderArgs {
            module_id: "reader".into(),
            action: AbsorbanceReaderAction::Lid { open },
        };
        let found = error_types(compound::absorbance_reader(&args, &ctx, &state));
        assert_eq!(found, vec![ErrorType::AbsorbanceReaderNoGripper]);
    }
}

// --- Waste chute ---

fn chute_context() -> InvariantContext {
    flex_context().with_equipment(equipment("wasteChute", EquipmentKind::WasteChute, Some("D3")))
}

fn into_chute(labware_id: &str) -> MoveLabwareParams {
    MoveLabwareParams {
        labware_id: labware_id.into(),
        new_location: LabwareLocation::WasteChute,
        strategy: LabwareMovementStrategy::UsingGripper,
    }
}

#[test]
fn test_discarding_a_full_tiprack_warns() {
    let ctx = chute_context();
    let state = flex_deck().build(&ctx);

    let output = atomic::move_labware(&into_chute(TIPRACK), &ctx, &state).unwrap();
    assert_eq!(command_types(&output), vec!["moveLabware"]);
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].warning_type, WarningType::TiprackInWasteChuteHasTips);
}

#[test]
fn test_discarding_labware_with_liquid_warns() {
    let ctx = chute_context();
    let state = flex_deck().build(&ctx);

    let output = atomic::move_labware(&into_chute(RESERVOIR), &ctx, &state).unwrap();
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].warning_type, WarningType::LabwareInWasteChuteHasLiquid);

    // An empty plate goes quietly.
    let output = atomic::move_labware(&into_chute(PLATE), &ctx, &state).unwrap();
    assert!(output.warnings.is_empty());
}

#[test]
fn test_discarded_labware_is_gone_for_good() {
    let ctx = chute_context();
    let state = flex_deck().tip_attached(PIPETTE).build(&ctx);
    let output = atomic::move_labware(&into_chute(PLATE), &ctx, &state).unwrap();
    let state = state.apply_commands(&output.commands, &ctx);

    let back = MoveLabwareParams {
        labware_id: PLATE.into(),
        new_location: LabwareLocation::Slot("C2".into()),
        strategy: LabwareMovementStrategy::UsingGripper,
    };
    let found = error_types(atomic::move_labware(&back, &ctx, &state));
    assert_eq!(found, vec![ErrorType::LabwareDiscardedInWasteChute]);

    let found = error_types(atomic::move_to_well(&well_target(PIPETTE, PLATE, "A1"), &ctx, &state));
    assert_eq!(found, vec![ErrorType::LabwareDiscardedInWasteChute]);
}

#[test]
fn test_waste_chute_must_be_installed() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);

    let failed = atomic::move_labware(&into_chute(RESERVOIR), &ctx, &state).unwrap_err();
    assert_eq!(failed.errors[0].error_type, ErrorType::EquipmentDoesNotExist);
    assert_eq!(failed.warnings[0].warning_type, WarningType::LabwareInWasteChuteHasLiquid);
}
