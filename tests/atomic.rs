// tests/atomic.rs
mod common;

use common::*;
use liquid_robot::atomic;
use liquid_robot::command::{
    AbsorbanceReadParams, BlowoutParams, Command, EngageParams, LabwareMovementStrategy, MoveLabwareParams,
    PickUpTipParams, PipettingParams, TemperatureParams, WellLocation, WellTargetParams,
};
use liquid_robot::entities::ModuleModel;
use liquid_robot::robot_state::{LabwareLocation, ModuleState};
use liquid_robot::{ErrorType, WarningType};
use pretty_assertions::assert_eq;

fn aspirate_params(labware: &str, well: &str, volume: f64) -> PipettingParams {
    PipettingParams {
        pipette_id: PIPETTE.into(),
        volume,
        labware_id: labware.into(),
        well_name: well.into(),
        well_location: WellLocation::bottom(1.0),
        flow_rate: 160.0,
    }
}

fn well_target(labware: &str, well: &str) -> WellTargetParams {
    WellTargetParams {
        pipette_id: PIPETTE.into(),
        labware_id: labware.into(),
        well_name: well.into(),
        well_location: WellLocation::top(-1.0),
    }
}

#[test]
fn test_no_tip_yields_exactly_one_error() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);

    let results = [
        atomic::aspirate(&aspirate_params(RESERVOIR, "A1", 50.0), &ctx, &state),
        atomic::dispense(&aspirate_params(PLATE, "A1", 50.0), &ctx, &state),
        atomic::blowout(
            &BlowoutParams {
                pipette_id: PIPETTE.into(),
                labware_id: PLATE.into(),
                well_name: "A1".into(),
                well_location: WellLocation::top(0.0),
                flow_rate: 80.0,
            },
            &ctx,
            &state,
        ),
        atomic::touch_tip(&well_target(PLATE, "A1"), &ctx, &state),
    ];
    for result in results {
        let errors = result.unwrap_err().errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ErrorType::NoTipOnPipette);
    }
}

#[test]
fn test_unknown_pipette_is_a_reference_error() {
    let ctx = flex_context();
    let state = flex_deck().tip_attached(PIPETTE).build(&ctx);
    let mut params = aspirate_params(RESERVOIR, "A1", 50.0);
    params.pipette_id = "ghost".into();

    let errors = atomic::aspirate(&params, &ctx, &state).unwrap_err().errors;
    assert_eq!(errors[0].error_type, ErrorType::PipetteDoesNotExist);
}

#[test]
fn test_aspirate_moves_liquid_into_the_tip() {
    let ctx = flex_context();
    let state = flex_deck().tip_attached(PIPETTE).build(&ctx);

    let output = atomic::aspirate(&aspirate_params(RESERVOIR, "A1", 150.0), &ctx, &state).unwrap();
    assert_eq!(command_types(&output), vec!["aspirate"]);
    assert!(output.warnings.is_empty());

    let next = state.apply_commands(&output.commands, &ctx);
    assert!((next.pipette_volume(PIPETTE) - 150.0).abs() < 1e-9);
    let left = next.well_liquid(RESERVOIR, "A1").unwrap();
    assert!((left["water"].volume - 9_850.0).abs() < 1e-9);
    // The earlier snapshot is untouched.
    assert_eq!(state.pipette_volume(PIPETTE), 0.0);
}

#[test]
fn test_aspirate_from_pristine_well_warns() {
    let ctx = flex_context();
    let state = flex_deck().tip_attached(PIPETTE).build(&ctx);

    let output = atomic::aspirate(&aspirate_params(PLATE, "A1", 20.0), &ctx, &state).unwrap();
    assert_eq!(output.commands.len(), 1);
    assert_eq!(output.warnings[0].warning_type, WarningType::AspirateFromPristineWell);
}

#[test]
fn test_aspirate_beyond_tip_capacity() {
    let ctx = flex_context();
    let state = flex_deck().tip_attached(PIPETTE).build(&ctx);

    let errors = atomic::aspirate(&aspirate_params(RESERVOIR, "A1", 300.0), &ctx, &state)
        .unwrap_err()
        .errors;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, ErrorType::TipVolumeExceeded);
}

#[test]
fn test_closed_thermocycler_lid_blocks_aspirate() {
    let ctx = with_module_plate(flex_context(), "tc", ModuleModel::ThermocyclerModuleV2, "pcrPlate");
    let state = flex_deck()
        .module("tc", "B1")
        .labware("pcrPlate", LabwareLocation::Module("tc".into()))
        .liquid("pcrPlate", "A1", "water", 100.0)
        .tip_attached(PIPETTE)
        .build(&ctx);
    let closed = state.apply_commands(&[Command::ThermocyclerCloseLid(module_params("tc"))], &ctx);

    let failed = atomic::aspirate(&aspirate_params("pcrPlate", "A1", 20.0), &ctx, &closed).unwrap_err();
    assert!(
        failed
            .errors
            .iter()
            .any(|e| e.error_type == ErrorType::ThermocyclerLidClosed)
    );

    let open = closed.apply_commands(&[Command::ThermocyclerOpenLid(module_params("tc"))], &ctx);
    assert!(atomic::aspirate(&aspirate_params("pcrPlate", "A1", 20.0), &ctx, &open).is_ok());
}

#[test]
fn test_pick_up_tip_consumes_the_well() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let params = PickUpTipParams {
        pipette_id: PIPETTE.into(),
        labware_id: TIPRACK.into(),
        well_name: "A1".into(),
    };

    let output = atomic::pick_up_tip(&params, &ctx, &state).unwrap();
    let next = state.apply_commands(&output.commands, &ctx);
    assert!(next.has_tip(PIPETTE));
    assert_eq!(next.tip_state.tipracks[TIPRACK]["A1"], false);
    assert_eq!(next.loaded_tip(PIPETTE).unwrap().volume, 200.0);

    let errors = atomic::pick_up_tip(&params, &ctx, &next).unwrap_err().errors;
    assert_eq!(errors[0].error_type, ErrorType::InsufficientTips);
}

#[test]
fn test_move_labware_into_occupied_slot() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let params = MoveLabwareParams {
        labware_id: PLATE.into(),
        new_location: LabwareLocation::Slot("B2".into()),
        strategy: LabwareMovementStrategy::UsingGripper,
    };

    let errors = atomic::move_labware(&params, &ctx, &state).unwrap_err().errors;
    assert_eq!(errors[0].error_type, ErrorType::LabwareLocationOccupied);

    let free = MoveLabwareParams {
        new_location: LabwareLocation::Slot("D2".into()),
        ..params
    };
    let output = atomic::move_labware(&free, &ctx, &state).unwrap();
    let next = state.apply_commands(&output.commands, &ctx);
    assert_eq!(
        next.labware_location(PLATE),
        Some(&LabwareLocation::Slot("D2".into()))
    );
}

#[test]
fn test_engage_on_temperature_module_is_unsupported() {
    let ctx = flex_context().with_module(module("temp", ModuleModel::TemperatureModuleV2));
    let state = flex_deck().module("temp", "D1").build(&ctx);

    let errors = atomic::engage_magnet(
        &EngageParams {
            module_id: "temp".into(),
            height: 10.0,
        },
        &ctx,
        &state,
    )
    .unwrap_err()
    .errors;
    assert_eq!(errors[0].error_type, ErrorType::UnsupportedModuleAction);
}

#[test]
fn test_await_temperature_needs_a_target() {
    let ctx = flex_context().with_module(module("temp", ModuleModel::TemperatureModuleV2));
    let state = flex_deck().module("temp", "D1").build(&ctx);
    let params = TemperatureParams {
        module_id: "temp".into(),
        celsius: 4.0,
    };

    let errors = atomic::await_temperature(&params, &ctx, &state).unwrap_err().errors;
    assert_eq!(errors[0].error_type, ErrorType::MissingTemperatureStep);

    let set = atomic::set_temperature(&params, &ctx, &state).unwrap();
    let heating = state.apply_commands(&set.commands, &ctx);
    let other = TemperatureParams {
        celsius: 25.0,
        ..params
    };
    let output = atomic::await_temperature(&other, &ctx, &heating).unwrap();
    assert_eq!(output.warnings[0].warning_type, WarningType::TemperatureMayNotBeReached);
}

#[test]
fn test_deactivating_a_thermocycler_emits_lid_then_block() {
    let ctx = with_module_plate(flex_context(), "tc", ModuleModel::ThermocyclerModuleV2, "pcrPlate");
    let state = flex_deck().module("tc", "B1").build(&ctx);

    let output = atomic::deactivate_temperature(&module_params("tc"), &ctx, &state).unwrap();
    assert_eq!(
        command_types(&output),
        vec!["thermocycler/deactivateLid", "thermocycler/deactivateBlock"]
    );
}

#[test]
fn test_absorbance_read_requires_initialization() {
    let ctx = flex_context().with_module(module("reader", ModuleModel::AbsorbanceReaderV1));
    let state = flex_deck().module("reader", "D3").build(&ctx);

    let errors = atomic::absorbance_reader_read(
        &AbsorbanceReadParams {
            module_id: "reader".into(),
            file_name: None,
        },
        &ctx,
        &state,
    )
    .unwrap_err()
    .errors;
    assert_eq!(errors[0].error_type, ErrorType::AbsorbanceReaderNoInitialization);
    assert!(matches!(
        state.module_state("reader"),
        Some(ModuleState::AbsorbanceReader(_))
    ));
}
