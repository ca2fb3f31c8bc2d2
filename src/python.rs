//! Renders commands as scripting-API calls.
//!
//! The output is a readable companion to the JSON command list, not a
//! complete script: entity loading and imports belong to the exporter.

use crate::command::{Command, LabwareMovementStrategy, WellLocation, WellOrigin};
use crate::entities::{EquipmentKind, InvariantContext};
use crate::robot_state::{LabwareLocation, MeasureMode, NozzleConfiguration};

/// One line per command that has a scripting equivalent, joined with newlines.
pub fn render_commands(commands: &[Command], ctx: &InvariantContext) -> Option<String> {
    let lines: Vec<String> = commands
        .iter()
        .filter_map(|c| render_command(c, ctx))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Scripting text for one command, or `None` for commands that only exist as
/// implicit moves in the scripting API.
pub fn render_command(command: &Command, ctx: &InvariantContext) -> Option<String> {
    let line = match command {
        // --- Pipetting ---
        Command::Aspirate(p) => {
            let pip = pipette_name(&p.pipette_id, ctx);
            let default = ctx
                .pipette(&p.pipette_id)
                .map_or(p.flow_rate, |e| e.spec.default_aspirate_flow_rate);
            format!(
                "{pip}.aspirate(volume={}, location={}, rate={})",
                p.volume,
                well_ref(&p.labware_id, &p.well_name, &p.well_location, ctx),
                rate(p.flow_rate, default)
            )
        }
        Command::Dispense(p) => {
            let pip = pipette_name(&p.pipette_id, ctx);
            let default = ctx
                .pipette(&p.pipette_id)
                .map_or(p.flow_rate, |e| e.spec.default_dispense_flow_rate);
            format!(
                "{pip}.dispense(volume={}, location={}, rate={})",
                p.volume,
                well_ref(&p.labware_id, &p.well_name, &p.well_location, ctx),
                rate(p.flow_rate, default)
            )
        }
        Command::Blowout(p) => format!(
            "{}.blow_out({})",
            pipette_name(&p.pipette_id, ctx),
            well_ref(&p.labware_id, &p.well_name, &p.well_location, ctx)
        ),
        Command::TouchTip(p) => format!(
            "{}.touch_tip({}[{:?}], v_offset={})",
            pipette_name(&p.pipette_id, ctx),
            labware_name(&p.labware_id, ctx),
            p.well_name,
            p.well_location.offset.z
        ),
        Command::MoveToWell(p) => format!(
            "{}.move_to({})",
            pipette_name(&p.pipette_id, ctx),
            well_ref(&p.labware_id, &p.well_name, &p.well_location, ctx)
        ),
        Command::AirGapInPlace(p) => format!(
            "{}.air_gap(volume={}, in_place=True)",
            pipette_name(&p.pipette_id, ctx),
            p.volume
        ),
        Command::BlowOutInPlace(p) => format!("{}.blow_out()", pipette_name(&p.pipette_id, ctx)),
        Command::MoveToAddressableArea(_) | Command::MoveToAddressableAreaForDropTip(_) => {
            return None;
        }

        // --- Tips ---
        Command::PickUpTip(p) => format!(
            "{}.pick_up_tip({}[{:?}])",
            pipette_name(&p.pipette_id, ctx),
            labware_name(&p.labware_id, ctx),
            p.well_name
        ),
        Command::DropTipInPlace(p) => format!("{}.drop_tip()", pipette_name(&p.pipette_id, ctx)),
        Command::ConfigureForVolume(p) => format!(
            "{}.configure_for_volume({})",
            pipette_name(&p.pipette_id, ctx),
            p.volume
        ),
        Command::ConfigureNozzleLayout(p) => {
            let pip = pipette_name(&p.pipette_id, ctx);
            let style = match p.configuration_params.style {
                NozzleConfiguration::All => "ALL",
                NozzleConfiguration::Column => "COLUMN",
                NozzleConfiguration::Single => "SINGLE",
            };
            match &p.configuration_params.primary_nozzle {
                Some(start) => format!("{pip}.configure_nozzle_layout(style={style}, start={start:?})"),
                None => format!("{pip}.configure_nozzle_layout(style={style})"),
            }
        }

        // --- Labware ---
        Command::MoveLabware(p) => {
            let gripper = match p.strategy {
                LabwareMovementStrategy::UsingGripper => "True",
                LabwareMovementStrategy::ManualMoveWithPause => "False",
            };
            format!(
                "protocol.move_labware({}, {}, use_gripper={gripper})",
                labware_name(&p.labware_id, ctx),
                location_ref(&p.new_location, ctx)
            )
        }

        // --- Modules ---
        Command::EngageMagnet(p) => format!(
            "{}.engage(height_from_base={})",
            module_name(&p.module_id, ctx),
            p.height
        ),
        Command::DisengageMagnet(p) => format!("{}.disengage()", module_name(&p.module_id, ctx)),
        Command::TemperatureSetTarget(p) => format!(
            "{}.start_set_temperature({})",
            module_name(&p.module_id, ctx),
            p.celsius
        ),
        Command::TemperatureWait(p) => format!(
            "{}.await_temperature({})",
            module_name(&p.module_id, ctx),
            p.celsius
        ),
        Command::TemperatureDeactivate(p) => format!("{}.deactivate()", module_name(&p.module_id, ctx)),
        Command::HeaterShakerSetTargetTemperature(p) => format!(
            "{}.set_target_temperature({})",
            module_name(&p.module_id, ctx),
            p.celsius
        ),
        Command::HeaterShakerWaitForTemperature(p) => {
            format!("{}.wait_for_temperature()", module_name(&p.module_id, ctx))
        }
        Command::HeaterShakerDeactivateHeater(p) => {
            format!("{}.deactivate_heater()", module_name(&p.module_id, ctx))
        }
        Command::HeaterShakerSetShakeSpeed(p) => format!(
            "{}.set_and_wait_for_shake_speed({})",
            module_name(&p.module_id, ctx),
            p.rpm
        ),
        Command::HeaterShakerDeactivateShaker(p) => {
            format!("{}.deactivate_shaker()", module_name(&p.module_id, ctx))
        }
        Command::HeaterShakerOpenLatch(p) => {
            format!("{}.open_labware_latch()", module_name(&p.module_id, ctx))
        }
        Command::HeaterShakerCloseLatch(p) => {
            format!("{}.close_labware_latch()", module_name(&p.module_id, ctx))
        }
        Command::ThermocyclerSetBlockTemperature(p) => {
            let tc = module_name(&p.module_id, ctx);
            match p.block_max_volume_ul {
                Some(v) => format!("{tc}.set_block_temperature({}, block_max_volume={v})", p.celsius),
                None => format!("{tc}.set_block_temperature({})", p.celsius),
            }
        }
        Command::ThermocyclerSetLidTemperature(p) => format!(
            "{}.set_lid_temperature({})",
            module_name(&p.module_id, ctx),
            p.celsius
        ),
        Command::ThermocyclerWaitForBlockTemperature(_) | Command::ThermocyclerWaitForLidTemperature(_) => {
            return None;
        }
        Command::ThermocyclerDeactivateBlock(p) => {
            format!("{}.deactivate_block()", module_name(&p.module_id, ctx))
        }
        Command::ThermocyclerDeactivateLid(p) => format!("{}.deactivate_lid()", module_name(&p.module_id, ctx)),
        Command::ThermocyclerOpenLid(p) => format!("{}.open_lid()", module_name(&p.module_id, ctx)),
        Command::ThermocyclerCloseLid(p) => format!("{}.close_lid()", module_name(&p.module_id, ctx)),
        Command::ThermocyclerRunProfile(p) => {
            let steps: Vec<String> = p
                .profile
                .iter()
                .map(|s| {
                    format!(
                        "{{\"temperature\": {}, \"hold_time_seconds\": {}}}",
                        s.celsius, s.hold_seconds
                    )
                })
                .collect();
            format!(
                "{}.execute_profile(steps=[{}], repetitions=1, block_max_volume={})",
                module_name(&p.module_id, ctx),
                steps.join(", "),
                p.block_max_volume_ul
            )
        }
        Command::AbsorbanceReaderOpenLid(p) => format!("{}.open_lid()", module_name(&p.module_id, ctx)),
        Command::AbsorbanceReaderCloseLid(p) => format!("{}.close_lid()", module_name(&p.module_id, ctx)),
        Command::AbsorbanceReaderInitialize(p) => {
            let mode = match p.measure_mode {
                MeasureMode::Single => "single",
                MeasureMode::Multi => "multi",
            };
            let reader = module_name(&p.module_id, ctx);
            match p.reference_wavelength {
                Some(r) => format!(
                    "{reader}.initialize({mode:?}, {:?}, reference_wavelength={r})",
                    p.sample_wavelengths
                ),
                None => format!("{reader}.initialize({mode:?}, {:?})", p.sample_wavelengths),
            }
        }
        Command::AbsorbanceReaderRead(p) => {
            let reader = module_name(&p.module_id, ctx);
            match &p.file_name {
                Some(name) => format!("{reader}.read(export_filename={name:?})"),
                None => format!("{reader}.read()"),
            }
        }

        // --- Flow ---
        Command::Comment(p) => format!("protocol.comment({:?})", p.message),
        Command::WaitForDuration(p) => match &p.message {
            Some(msg) => format!("protocol.delay(seconds={}, msg={msg:?})", p.seconds),
            None => format!("protocol.delay(seconds={})", p.seconds),
        },
        Command::WaitForResume(p) => match &p.message {
            Some(msg) => format!("protocol.pause({msg:?})"),
            None => "protocol.pause()".to_string(),
        },
    };
    Some(line)
}

fn rate(flow_rate: f64, default: f64) -> f64 {
    if default > 0.0 { flow_rate / default } else { 1.0 }
}

fn well_ref(labware_id: &str, well: &str, location: &WellLocation, ctx: &InvariantContext) -> String {
    let base = format!("{}[{well:?}]", labware_name(labware_id, ctx));
    match location.origin {
        WellOrigin::Bottom => format!("{base}.bottom(z={})", location.offset.z),
        WellOrigin::Top => format!("{base}.top(z={})", location.offset.z),
        WellOrigin::Center => format!("{base}.center()"),
    }
}

fn location_ref(location: &LabwareLocation, ctx: &InvariantContext) -> String {
    match location {
        LabwareLocation::Slot(slot) => format!("{slot:?}"),
        LabwareLocation::Module(id) => module_name(id, ctx),
        LabwareLocation::Labware(id) => labware_name(id, ctx),
        LabwareLocation::OffDeck => "OFF_DECK".to_string(),
        LabwareLocation::WasteChute => ctx
            .additional_equipment_entities
            .values()
            .find(|e| e.kind == EquipmentKind::WasteChute)
            .map(|e| variable_name(e.python_name.as_deref(), "waste_chute", &e.id))
            .unwrap_or_else(|| "waste_chute".to_string()),
    }
}

fn pipette_name(id: &str, ctx: &InvariantContext) -> String {
    let explicit = ctx.pipette(id).and_then(|p| p.python_name.as_deref());
    variable_name(explicit, "pipette", id)
}

fn labware_name(id: &str, ctx: &InvariantContext) -> String {
    let explicit = ctx.labware(id).and_then(|l| l.python_name.as_deref());
    variable_name(explicit, "labware", id)
}

fn module_name(id: &str, ctx: &InvariantContext) -> String {
    let explicit = ctx.module(id).and_then(|m| m.python_name.as_deref());
    variable_name(explicit, "module", id)
}

/// The explicit name if there is one, else `prefix_<sanitized id>`.
fn variable_name(explicit: Option<&str>, prefix: &str, id: &str) -> String {
    if let Some(name) = explicit {
        return name.to_string();
    }
    let sanitized: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{prefix}_{sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommentParams, ModuleParams};

    #[test]
    fn unnamed_entities_get_sanitized_variables() {
        assert_eq!(variable_name(None, "labware", "plate-1:A"), "labware_plate_1_a");
        assert_eq!(variable_name(Some("plate"), "labware", "plate-1"), "plate");
    }

    #[test]
    fn comments_are_quoted() {
        let ctx = InvariantContext::default();
        let line = render_command(
            &Command::Comment(CommentParams {
                message: "say \"hi\"".into(),
            }),
            &ctx,
        );
        assert_eq!(line.as_deref(), Some(r#"protocol.comment("say \"hi\"")"#));
        let lid = render_command(
            &Command::ThermocyclerOpenLid(ModuleParams {
                module_id: "tc".into(),
            }),
            &ctx,
        );
        assert_eq!(lid.as_deref(), Some("module_tc.open_lid()"));
    }
}
