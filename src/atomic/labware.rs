//! Moving labware around the deck, manually or with the gripper.

use crate::command::{Command, LabwareMovementStrategy, MoveLabwareParams};
use crate::creator::{CommandCreatorResult, emit, fail, fail_if_any};
use crate::entities::{EquipmentKind, InvariantContext};
use crate::errors::{self, CommandCreatorError};
use crate::robot_state::{LabwareLocation, ModuleState, RobotState};

/// Module a location resolves into, looking through adapters.
fn module_at<'s>(location: &'s LabwareLocation, state: &'s RobotState) -> Option<&'s str> {
    match location {
        LabwareLocation::Module(id) => Some(id.as_str()),
        LabwareLocation::Labware(id) => state.module_under_labware(id),
        _ => None,
    }
}

/// Lid and latch must be open for labware to pass in or out of a module.
fn module_access_errors(module_id: &str, state: &RobotState) -> Option<CommandCreatorError> {
    match state.module_state(module_id)? {
        ModuleState::HeaterShaker(hs) if hs.latch_open != Some(true) => {
            Some(errors::heater_shaker_latch_closed())
        }
        ModuleState::Thermocycler(tc) if tc.lid_open != Some(true) => {
            Some(errors::thermocycler_lid_closed())
        }
        ModuleState::AbsorbanceReader(ar) if ar.lid_open != Some(true) => {
            Some(errors::absorbance_reader_lid_closed())
        }
        _ => None,
    }
}

fn describe(location: &LabwareLocation) -> String {
    match location {
        LabwareLocation::Slot(slot) => format!("slot {slot}"),
        LabwareLocation::Module(id) => format!("module {id}"),
        LabwareLocation::Labware(id) => format!("labware {id}"),
        LabwareLocation::OffDeck => "off deck".to_string(),
        LabwareLocation::WasteChute => "waste chute".to_string(),
    }
}

/// Moves labware to a slot, module, adapter, off deck or into the waste chute.
pub fn move_labware(args: &MoveLabwareParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let id = args.labware_id.as_str();
    let Some(entity) = ctx.labware(id) else {
        return fail(errors::labware_does_not_exist(id));
    };
    let Some(current) = state.labware_location(id) else {
        return fail(errors::labware_does_not_exist(id));
    };
    if *current == LabwareLocation::WasteChute {
        return fail(errors::labware_discarded_in_waste_chute(id));
    }

    let mut found = Vec::new();
    let mut warnings = Vec::new();
    let using_gripper = args.strategy == LabwareMovementStrategy::UsingGripper;

    if using_gripper {
        if !ctx.has_gripper() {
            found.push(errors::gripper_required());
        }
        if *current == LabwareLocation::OffDeck {
            found.push(errors::labware_off_deck(id));
        }
    }

    // --- Destination ---
    let occupied = match &args.new_location {
        LabwareLocation::Slot(slot) => {
            state.occupant_of(&args.new_location).is_some_and(|o| o != id)
                || state.module_in_slot(slot).is_some()
        }
        LabwareLocation::Module(module_id) => {
            if ctx.module(module_id).is_none() || state.module_state(module_id).is_none() {
                found.push(errors::missing_module(module_id));
            }
            state.occupant_of(&args.new_location).is_some_and(|o| o != id)
        }
        LabwareLocation::Labware(parent) => {
            if parent == id || state.is_in_stack_of(parent, id) {
                found.push(errors::invalid_labware_location(id));
            } else if ctx.labware(parent).is_none() {
                found.push(errors::labware_does_not_exist(parent));
            }
            state.occupant_of(&args.new_location).is_some_and(|o| o != id)
        }
        LabwareLocation::WasteChute => {
            let has_chute = ctx
                .additional_equipment_entities
                .values()
                .any(|e| e.kind == EquipmentKind::WasteChute);
            if !has_chute {
                found.push(errors::equipment_does_not_exist("wasteChute"));
            }
            if entity.def.is_tiprack()
                && state
                    .tip_state
                    .tipracks
                    .get(id)
                    .is_some_and(|rack| rack.values().any(|present| *present))
            {
                warnings.push(errors::tiprack_in_waste_chute_has_tips());
            }
            let has_liquid = state
                .liquid_state
                .labware
                .get(id)
                .is_some_and(|wells| wells.values().any(|w| w.values().any(|v| v.volume > 0.0)));
            if has_liquid {
                warnings.push(errors::labware_in_waste_chute_has_liquid());
            }
            false
        }
        LabwareLocation::OffDeck => false,
    };
    if occupied {
        found.push(errors::labware_location_occupied(&describe(&args.new_location)));
    }

    // --- Modules on either end ---
    for module_id in [module_at(current, state), module_at(&args.new_location, state)]
        .into_iter()
        .flatten()
    {
        if let Some(err) = module_access_errors(module_id, state)
            && !found.contains(&err)
        {
            found.push(err);
        }
    }

    if let Err(mut failed) = fail_if_any(found) {
        failed.warnings = warnings;
        return Err(failed);
    }
    emit(vec![Command::MoveLabware(args.clone())], warnings, ctx)
}
