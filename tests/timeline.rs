// tests/timeline.rs
mod common;

use common::*;
use liquid_robot::command::CommentParams;
use liquid_robot::compound::{MixArgs, TipPolicy};
use liquid_robot::{
    CompilerConfig, ErrorType, ProtocolFile, SequentialKeys, StepArgs, TimelineCompiler,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tracing_test::traced_test;

fn comment(message: &str) -> StepArgs {
    StepArgs::Comment(CommentParams {
        message: message.into(),
    })
}

fn mix_step(change_tip: TipPolicy) -> StepArgs {
    StepArgs::Mix(MixArgs {
        pipette_id: PIPETTE.into(),
        labware_id: RESERVOIR.into(),
        wells: vec!["A1".into()],
        volume: 100.0,
        times: 1,
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
    })
}

#[test]
#[traced_test]
fn test_failed_step_does_not_stop_the_timeline() {
    let ctx = flex_context();
    let initial = flex_deck().build(&ctx);
    let steps = vec![comment("start"), mix_step(TipPolicy::Never), mix_step(TipPolicy::Once)];

    let timeline = TimelineCompiler::default().compile_with_keys(
        &ctx,
        &initial,
        &steps,
        &mut SequentialKeys::default(),
    );

    assert_eq!(timeline.frames.len(), 3);
    assert!(timeline.frames[0].is_ok());
    assert_eq!(timeline.frames[1].errors[0].error_type, ErrorType::NoTipOnPipette);
    assert!(timeline.frames[1].commands.is_empty());
    assert_eq!(timeline.frames[1].robot_state, timeline.frames[0].robot_state);
    assert!(timeline.frames[2].is_ok());
    assert!(timeline.frames[2].robot_state.has_tip(PIPETTE));
    assert!(timeline.has_errors());
    assert!(logs_contain("step failed"));
    assert!(logs_contain("Some(State)"));
}

#[test]
fn test_sequential_keys_run_across_steps() {
    let ctx = flex_context();
    let initial = flex_deck().build(&ctx);
    let steps = vec![comment("one"), comment("two")];

    let timeline = TimelineCompiler::default().compile_with_keys(
        &ctx,
        &initial,
        &steps,
        &mut SequentialKeys::new("k"),
    );
    let keys: Vec<&str> = timeline.commands().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["k-0", "k-1"]);
    assert_eq!(timeline.python(), "protocol.comment(\"one\")\nprotocol.comment(\"two\")");
}

#[test]
fn test_python_can_be_switched_off() {
    let ctx = flex_context();
    let initial = flex_deck().build(&ctx);
    let config = CompilerConfig {
        emit_python: false,
        ..CompilerConfig::default()
    };

    let timeline = TimelineCompiler::new(config).compile(&ctx, &initial, &[comment("quiet")]);
    assert_eq!(timeline.frames[0].python, None);
    assert_eq!(timeline.frames[0].commands.len(), 1);
}

#[test]
fn test_protocol_file_from_json() {
    let ctx = flex_context();
    let protocol = json!({
        "invariantContext": serde_json::to_value(&ctx).unwrap(),
        "initialDeck": {
            "pipettes": { "pipette": "left" },
            "labware": {
                "tiprack": { "slot": "B2" },
                "plate": { "slot": "C2" },
                "reservoir": { "slot": "C1" }
            },
            "liquids": [
                { "labwareId": "reservoir", "well": "A1", "liquidId": "water", "volume": 5000.0 }
            ]
        },
        "steps": [
            {
                "stepType": "moveLiquid",
                "path": "single",
                "pipetteId": "pipette",
                "volume": 50,
                "sourceLabware": "reservoir",
                "destLabware": "plate",
                "changeTip": "once",
                "dropTipLocation": "trashBin",
                "sourceWells": ["A1"],
                "destWells": ["A1", "B1", "C1"]
            },
            { "stepType": "pause", "pauseAction": "delay", "seconds": 30 },
            { "stepType": "comment", "message": "done" }
        ]
    });

    let protocol = ProtocolFile::from_json(&protocol.to_string()).unwrap();
    assert_eq!(protocol.steps[0].step_type(), "transfer");

    let mut keys = SequentialKeys::default();
    let compiler = TimelineCompiler::default();
    let initial = protocol.initial_deck.clone().into_robot_state(&protocol.invariant_context);
    let timeline = compiler.compile_with_keys(&protocol.invariant_context, &initial, &protocol.steps, &mut keys);

    assert!(!timeline.has_errors());
    let transfer = &timeline.frames[0];
    let aspirates = transfer
        .commands
        .iter()
        .filter(|c| c.command.command_type() == "aspirate")
        .count();
    assert_eq!(aspirates, 3);
    assert_eq!(timeline.frames[1].commands[0].command.command_type(), "waitForDuration");

    let last = &timeline.frames[0].robot_state;
    let left = last.well_liquid(RESERVOIR, "A1").unwrap();
    assert!((left["water"].volume - 4_850.0).abs() < 1e-9);
}

#[test]
fn test_keyed_commands_serialize_flat() {
    let ctx = flex_context();
    let initial = flex_deck().build(&ctx);
    let timeline = TimelineCompiler::default().compile_with_keys(
        &ctx,
        &initial,
        &[comment("hello")],
        &mut SequentialKeys::default(),
    );

    let value = serde_json::to_value(&timeline.frames[0].commands[0]).unwrap();
    assert_eq!(
        value,
        json!({ "key": "cmd-0", "commandType": "comment", "params": { "message": "hello" } })
    );
}
