// tests/compound.rs
mod common;

use common::*;
use liquid_robot::command::{Command, ProfileStep};
use liquid_robot::compound::{
    self, AbsorbanceReaderAction, AbsorbanceReaderArgs, ConsolidateArgs, DisposalLocation, DisposalSettings,
    DistributeArgs, DropTipArgs, HeaterShakerArgs, LiquidHandlingArgs, MixArgs, ThermocyclerHold,
    ThermocyclerProfileArgs, ThermocyclerStateArgs, TipPolicy, TransferArgs, distribute_chunk_size,
};
use liquid_robot::entities::ModuleModel;
use liquid_robot::robot_state::MeasureMode;
use liquid_robot::{CommandsAndWarnings, ErrorType};
use pretty_assertions::assert_eq;

fn wells(names: &[&str]) -> Vec<String> {
    names.iter().map(|w| w.to_string()).collect()
}

fn count(output: &CommandsAndWarnings, command_type: &str) -> usize {
    output
        .commands
        .iter()
        .filter(|c| c.command_type() == command_type)
        .count()
}

fn volumes_of(output: &CommandsAndWarnings, command_type: &str) -> Vec<f64> {
    output
        .commands
        .iter()
        .filter(|c| c.command_type() == command_type)
        .filter_map(|c| match c {
            Command::Aspirate(p) | Command::Dispense(p) => Some(p.volume),
            _ => None,
        })
        .collect()
}

fn mix_args(wells: Vec<String>, change_tip: TipPolicy) -> MixArgs {
    MixArgs {
        pipette_id: PIPETTE.into(),
        labware_id: PLATE.into(),
        wells,
        volume: 50.0,
        times: 2,
        change_tip,
        tiprack: None,
        drop_tip_location: TRASH.into(),
        nozzles: None,
        aspirate_flow_rate: None,
        dispense_flow_rate: None,
        blowout_flow_rate: None,
        aspirate_offset_from_bottom: 1.0,
        dispense_offset_from_bottom: 1.0,
        aspirate_delay: None,
        dispense_delay: None,
        touch_tip: None,
        blowout: None,
        blowout_offset_from_top: 0.0,
    }
}

#[test]
fn test_mix_once_with_a_loaded_tip() {
    let ctx = flex_context();
    let state = flex_deck()
        .liquid(PLATE, "A1", "water", 150.0)
        .liquid(PLATE, "B1", "water", 150.0)
        .tip_attached(PIPETTE)
        .build(&ctx);

    let output = compound::mix(&mix_args(wells(&["A1", "B1"]), TipPolicy::Once), &ctx, &state).unwrap();
    assert_eq!(
        command_types(&output),
        vec![
            "moveToAddressableAreaForDropTip",
            "dropTipInPlace",
            "pickUpTip",
            "aspirate",
            "dispense",
            "aspirate",
            "dispense",
            "aspirate",
            "dispense",
            "aspirate",
            "dispense",
        ]
    );
    let targets: Vec<&str> = output
        .commands
        .iter()
        .filter_map(|c| match c {
            Command::Aspirate(p) => Some(p.well_name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(targets, vec!["A1", "A1", "B1", "B1"]);
}

#[test]
fn test_mix_always_picks_a_tip_per_well() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);

    let output = compound::mix(
        &mix_args(wells(&["A1", "B1", "C1"]), TipPolicy::Always),
        &ctx,
        &state,
    )
    .unwrap();
    assert_eq!(count(&output, "pickUpTip"), 3);
    assert_eq!(count(&output, "dropTipInPlace"), 2);
}

#[test]
fn test_mix_never_without_a_tip_fails() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);

    let failed = compound::mix(&mix_args(wells(&["A1"]), TipPolicy::Never), &ctx, &state).unwrap_err();
    assert_eq!(failed.errors.len(), 1);
    assert_eq!(failed.errors[0].error_type, ErrorType::NoTipOnPipette);
}

#[test]
fn test_distribute_chunks_around_the_disposal_volume() {
    assert_eq!(distribute_chunk_size(200.0, 0.0, 20.0, 50.0), 3);

    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let args = DistributeArgs {
        common: LiquidHandlingArgs::new(PIPETTE, 50.0, RESERVOIR, PLATE, TRASH).with_change_tip(TipPolicy::Once),
        source_well: "A1".into(),
        dest_wells: wells(&["A1", "B1", "C1", "D1", "E1", "F1", "G1"]),
        disposal: Some(DisposalSettings {
            volume: 20.0,
            location: DisposalLocation::SourceWell,
        }),
    };

    let output = compound::distribute(&args, &ctx, &state).unwrap();
    assert_eq!(volumes_of(&output, "aspirate"), vec![170.0, 150.0, 50.0]);
    assert_eq!(count(&output, "dispense"), 7);
    assert_eq!(count(&output, "pickUpTip"), 1);
    assert_eq!(count(&output, "blowout"), 1);
    assert_eq!(
        output.commands.last().map(Command::command_type),
        Some("dropTipInPlace")
    );
}

#[test]
fn test_distribute_rejects_volumes_beyond_the_tip() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let args = DistributeArgs {
        common: LiquidHandlingArgs::new(PIPETTE, 250.0, RESERVOIR, PLATE, TRASH),
        source_well: "A1".into(),
        dest_wells: wells(&["A1", "B1"]),
        disposal: None,
    };

    let errors = compound::distribute(&args, &ctx, &state).unwrap_err().errors;
    assert_eq!(errors[0].error_type, ErrorType::PipetteVolumeExceeded);
}

#[test]
fn test_transfer_splits_large_volumes() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let args = TransferArgs {
        common: LiquidHandlingArgs::new(PIPETTE, 300.0, RESERVOIR, PLATE, TRASH),
        source_wells: wells(&["A1"]),
        dest_wells: wells(&["A1", "A2"]),
        mix_in_destination: None,
    };

    let output = compound::transfer(&args, &ctx, &state).unwrap();
    assert_eq!(volumes_of(&output, "aspirate"), vec![150.0; 4]);
    assert_eq!(count(&output, "pickUpTip"), 4);
    assert_eq!(count(&output, "dropTipInPlace"), 4);
}

#[test]
fn test_transfer_per_source_keeps_the_tip_for_one_source() {
    let ctx = flex_context();
    let state = flex_deck().liquid(RESERVOIR, "A2", "buffer", 5_000.0).build(&ctx);
    let args = TransferArgs {
        common: LiquidHandlingArgs::new(PIPETTE, 40.0, RESERVOIR, PLATE, TRASH).with_change_tip(TipPolicy::PerSource),
        source_wells: wells(&["A1", "A1", "A2"]),
        dest_wells: wells(&["A1", "B1", "C1"]),
        mix_in_destination: None,
    };

    let output = compound::transfer(&args, &ctx, &state).unwrap();
    assert_eq!(count(&output, "pickUpTip"), 2);
}

#[test]
fn test_transfer_mismatched_wells() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let args = TransferArgs {
        common: LiquidHandlingArgs::new(PIPETTE, 30.0, RESERVOIR, PLATE, TRASH),
        source_wells: wells(&["A1", "A2"]),
        dest_wells: wells(&["A1", "B1", "C1"]),
        mix_in_destination: None,
    };

    let errors = compound::transfer(&args, &ctx, &state).unwrap_err().errors;
    assert_eq!(errors[0].error_type, ErrorType::MismatchedWellCount);
}

#[test]
fn test_consolidate_fills_the_tip_before_dispensing() {
    let ctx = flex_context();
    let mut deck = flex_deck();
    for w in ["A1", "B1", "C1", "D1", "E1"] {
        deck = deck.liquid(PLATE, w, "sample", 100.0);
    }
    let state = deck.build(&ctx);
    let args = ConsolidateArgs {
        common: LiquidHandlingArgs::new(PIPETTE, 50.0, PLATE, RESERVOIR, TRASH).with_change_tip(TipPolicy::Once),
        source_wells: wells(&["A1", "B1", "C1", "D1", "E1"]),
        dest_well: "A12".into(),
        mix_in_destination: None,
    };

    let output = compound::consolidate(&args, &ctx, &state).unwrap();
    assert_eq!(count(&output, "aspirate"), 5);
    assert_eq!(volumes_of(&output, "dispense"), vec![200.0, 50.0]);
    assert_eq!(count(&output, "pickUpTip"), 1);
    assert!(output.warnings.is_empty());
}

#[test]
fn test_heater_shaker_order() {
    let ctx = flex_context().with_module(module("hs", ModuleModel::HeaterShakerModuleV1));
    let state = flex_deck().module("hs", "D1").build(&ctx);
    let args = HeaterShakerArgs {
        module_id: "hs".into(),
        rpm: Some(300.0),
        target_temperature: Some(37.0),
        latch_open: false,
        timer_seconds: None,
    };

    let output = compound::heater_shaker(&args, &ctx, &state).unwrap();
    assert_eq!(
        command_types(&output),
        vec![
            "heaterShaker/closeLabwareLatch",
            "heaterShaker/setTargetTemperature",
            "heaterShaker/setAndWaitForShakeSpeed",
        ]
    );

    let timed = HeaterShakerArgs {
        timer_seconds: Some(60.0),
        ..args.clone()
    };
    let output = compound::heater_shaker(&timed, &ctx, &state).unwrap();
    assert_eq!(
        command_types(&output)[3..].to_vec(),
        vec![
            "waitForDuration",
            "heaterShaker/deactivateShaker",
            "heaterShaker/deactivateHeater",
        ]
    );

    let shaking_open = HeaterShakerArgs {
        latch_open: true,
        ..args
    };
    let errors = compound::heater_shaker(&shaking_open, &ctx, &state).unwrap_err().errors;
    assert_eq!(errors[0].error_type, ErrorType::HeaterShakerLatchOpen);
}

#[test]
fn test_thermocycler_state_only_emits_changes() {
    let ctx = with_module_plate(flex_context(), "tc", ModuleModel::ThermocyclerModuleV2, "pcrPlate");
    let state = flex_deck().module("tc", "B1").build(&ctx);
    let args = ThermocyclerStateArgs {
        module_id: "tc".into(),
        block_target_temp: Some(4.0),
        block_max_volume: Some(50.0),
        lid_target_temp: Some(40.0),
        lid_open: false,
    };

    let output = compound::thermocycler_state_step(&args, &ctx, &state).unwrap();
    assert_eq!(
        command_types(&output),
        vec![
            "thermocycler/closeLid",
            "thermocycler/setTargetBlockTemperature",
            "thermocycler/waitForBlockTemperature",
            "thermocycler/setTargetLidTemperature",
            "thermocycler/waitForLidTemperature",
        ]
    );

    let settled = state.apply_commands(&output.commands, &ctx);
    let again = compound::thermocycler_state_step(&args, &ctx, &settled).unwrap();
    assert!(again.commands.is_empty());
}

#[test]
fn test_thermocycler_profile_then_hold() {
    let ctx = with_module_plate(flex_context(), "tc", ModuleModel::ThermocyclerModuleV2, "pcrPlate");
    let state = flex_deck().module("tc", "B1").build(&ctx);
    let args = ThermocyclerProfileArgs {
        module_id: "tc".into(),
        profile: vec![
            ProfileStep {
                celsius: 95.0,
                hold_seconds: 30.0,
            },
            ProfileStep {
                celsius: 72.0,
                hold_seconds: 60.0,
            },
        ],
        profile_target_lid_temp: 105.0,
        block_max_volume: 50.0,
        hold: ThermocyclerHold {
            block_target_temp: Some(4.0),
            lid_target_temp: None,
            lid_open: true,
        },
    };

    let output = compound::thermocycler_profile_step(&args, &ctx, &state).unwrap();
    assert_eq!(
        command_types(&output),
        vec![
            "thermocycler/closeLid",
            "thermocycler/setTargetLidTemperature",
            "thermocycler/waitForLidTemperature",
            "thermocycler/runProfile",
            "thermocycler/setTargetBlockTemperature",
            "thermocycler/waitForBlockTemperature",
            "thermocycler/deactivateLid",
            "thermocycler/openLid",
        ]
    );
}

#[test]
fn test_absorbance_reader_closes_lid_before_initialize() {
    let ctx = flex_context().with_module(module("reader", ModuleModel::AbsorbanceReaderV1));
    let state = flex_deck().module("reader", "D3").build(&ctx);
    let initialize = AbsorbanceReaderArgs {
        module_id: "reader".into(),
        action: AbsorbanceReaderAction::Initialize {
            measure_mode: MeasureMode::Single,
            sample_wavelengths: vec![450],
            reference_wavelength: None,
        },
    };

    let output = compound::absorbance_reader(&initialize, &ctx, &state).unwrap();
    assert_eq!(
        command_types(&output),
        vec!["absorbanceReader/closeLid", "absorbanceReader/initialize"]
    );

    let ready = state.apply_commands(&output.commands, &ctx);
    let read = AbsorbanceReaderArgs {
        module_id: "reader".into(),
        action: AbsorbanceReaderAction::Read { file_name: None },
    };
    let output = compound::absorbance_reader(&read, &ctx, &ready).unwrap();
    assert_eq!(command_types(&output), vec!["absorbanceReader/read"]);
}

#[test]
fn test_drop_tip_routes_through_the_trash_bin() {
    let ctx = flex_context();
    let state = flex_deck().tip_attached(PIPETTE).build(&ctx);

    let output = compound::drop_tip(
        &DropTipArgs {
            pipette_id: PIPETTE.into(),
            drop_tip_location: TRASH.into(),
        },
        &ctx,
        &state,
    )
    .unwrap();
    match &output.commands[0] {
        Command::MoveToAddressableAreaForDropTip(p) => {
            assert_eq!(p.addressable_area_name, "movableTrashA3");
        }
        other => panic!("unexpected first command {other:?}"),
    }

    let errors = compound::drop_tip(
        &DropTipArgs {
            pipette_id: PIPETTE.into(),
            drop_tip_location: "nowhere".into(),
        },
        &ctx,
        &state,
    )
    .unwrap_err()
    .errors;
    assert_eq!(errors[0].error_type, ErrorType::DropTipLocationDoesNotExist);
}

#[test]
fn test_distribute_always_aspirates_disposal_on_every_chunk() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let args = DistributeArgs {
        common: LiquidHandlingArgs::new(PIPETTE, 50.0, RESERVOIR, PLATE, TRASH).with_change_tip(TipPolicy::Always),
        source_well: "A1".into(),
        dest_wells: wells(&["A1", "B1", "C1", "D1", "E1", "F1", "G1"]),
        disposal: Some(DisposalSettings {
            volume: 20.0,
            location: DisposalLocation::SourceWell,
        }),
    };

    let output = compound::distribute(&args, &ctx, &state).unwrap();
    assert_eq!(volumes_of(&output, "aspirate"), vec![170.0, 170.0, 70.0]);
    assert_eq!(count(&output, "blowout"), 3);
    assert_eq!(count(&output, "pickUpTip"), 3);
}

#[test]
fn test_dispense_air_gap_only_before_the_tip_is_dropped() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let mut common = LiquidHandlingArgs::new(PIPETTE, 200.0, RESERVOIR, PLATE, TRASH).with_change_tip(TipPolicy::Once);
    common.dispense_air_gap = Some(10.0);
    let args = TransferArgs {
        common,
        source_wells: wells(&["A1"]),
        dest_wells: wells(&["A1", "B1"]),
        mix_in_destination: None,
    };

    let output = compound::transfer(&args, &ctx, &state).unwrap();
    assert_eq!(count(&output, "airGapInPlace"), 1);
    assert_eq!(count(&output, "pickUpTip"), 1);
    assert_eq!(count(&output, "dropTipInPlace"), 1);
    assert_eq!(
        output.commands.last().map(Command::command_type),
        Some("dropTipInPlace")
    );
}

#[test]
fn test_distribute_with_dispense_air_gap_reuses_the_tip() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let mut common = LiquidHandlingArgs::new(PIPETTE, 50.0, RESERVOIR, PLATE, TRASH).with_change_tip(TipPolicy::Once);
    common.dispense_air_gap = Some(10.0);
    let args = DistributeArgs {
        common,
        source_well: "A1".into(),
        dest_wells: wells(&["A1", "B1", "C1", "D1", "E1", "F1", "G1", "H1"]),
        disposal: None,
    };

    let output = compound::distribute(&args, &ctx, &state).unwrap();
    assert_eq!(volumes_of(&output, "aspirate"), vec![200.0, 200.0]);
    assert_eq!(count(&output, "airGapInPlace"), 1);
    assert_eq!(count(&output, "dropTipInPlace"), 1);
}

#[test]
fn test_unusable_volumes_fail_without_commands() {
    let ctx = flex_context();
    let state = flex_deck().build(&ctx);
    let transfer_of = |volume: f64| TransferArgs {
        common: LiquidHandlingArgs::new(PIPETTE, volume, RESERVOIR, PLATE, TRASH),
        source_wells: wells(&["A1"]),
        dest_wells: wells(&["A1"]),
        mix_in_destination: None,
    };

    for volume in [f64::NAN, f64::INFINITY, -5.0, 0.0] {
        let errors = compound::transfer(&transfer_of(volume), &ctx, &state).unwrap_err().errors;
        assert_eq!(errors[0].error_type, ErrorType::InvalidVolume);
    }

    let errors = compound::transfer(&transfer_of(1e12), &ctx, &state).unwrap_err().errors;
    assert_eq!(errors[0].error_type, ErrorType::PipetteVolumeExceeded);

    let mix = MixArgs {
        volume: f64::NAN,
        ..mix_args(wells(&["A1"]), TipPolicy::Always)
    };
    let errors = compound::mix(&mix, &ctx, &state).unwrap_err().errors;
    assert_eq!(errors[0].error_type, ErrorType::InvalidVolume);
}
