//! Topology selectors and the safety checks run before a pipette enters a well.
//!
//! Every check walks the location graph from the target labware down to its
//! deck slot, then looks at what shares that slot (modules, adapters) and what
//! sits next to it.

use crate::deck::{self, Direction, RobotType};
use crate::entities::{EquipmentKind, InvariantContext, PipetteEntity};
use crate::errors::{self, CommandCreatorError};
use crate::robot_state::{DeckPlacement, LabwareLocation, ModuleState, NozzleConfiguration, RobotState};
use bevy_math::bounding::{Aabb2d, IntersectsVolume};
use glam::Vec2;
use std::collections::BTreeSet;

/// Nozzle pitch of every multi-channel head, in mm.
pub const NOZZLE_PITCH: f32 = 9.0;

/// Clearance the 96-channel head body extends past its outermost nozzles.
const HEAD_OVERHANG_X: f32 = 36.0;
const HEAD_OVERHANG_Y: f32 = 27.0;

/// Height assumed for a trash bin when checking head clearance.
const TRASH_BIN_HEIGHT: f64 = 40.0;

/// Errors for a labware that cannot be reached at all.
pub fn check_labware_access(
    labware_id: &str,
    ctx: &InvariantContext,
    state: &RobotState,
) -> Vec<CommandCreatorError> {
    if ctx.labware(labware_id).is_none() {
        return vec![errors::labware_does_not_exist(labware_id)];
    }
    match state.labware_placement(labware_id) {
        Some(DeckPlacement::Slot(_)) => Vec::new(),
        Some(DeckPlacement::WasteChute) => vec![errors::labware_discarded_in_waste_chute(labware_id)],
        Some(DeckPlacement::OffDeck) | None => vec![errors::labware_off_deck(labware_id)],
    }
}

/// Hazards for `pipette` entering `well` of `labware_id`.
///
/// Assumes [`check_labware_access`] passed; a labware without a deck slot
/// yields no hazards here.
pub fn pipetting_hazards(
    pipette: &PipetteEntity,
    labware_id: &str,
    well: &str,
    ctx: &InvariantContext,
    state: &RobotState,
) -> Vec<CommandCreatorError> {
    let mut found = Vec::new();
    let Some(slot) = state.labware_slot(labware_id) else {
        return found;
    };
    let robot = ctx.robot_type;

    if deck::is_column_4(robot, &slot) {
        found.push(errors::pipetting_into_column_4(&slot));
    }

    // 1. The module the labware sits in.
    if let Some(module_id) = state.module_under_labware(labware_id) {
        let model = ctx.module(module_id).map(|m| m.model);
        if robot == RobotType::Ot2
            && pipette.is_gen1_multi_channel()
            && model.is_some_and(|m| m.has_multi_channel_collision_issue())
            && (slot == "1" || slot == "3")
        {
            found.push(errors::module_pipette_collision_danger());
        }
        match state.module_state(module_id) {
            Some(ModuleState::Thermocycler(tc)) if tc.lid_open != Some(true) => {
                found.push(errors::thermocycler_lid_closed());
            }
            Some(ModuleState::AbsorbanceReader(ar)) if ar.lid_open != Some(true) => {
                found.push(errors::absorbance_reader_lid_closed());
            }
            Some(ModuleState::HeaterShaker(hs)) => {
                if hs.latch_open == Some(true) {
                    found.push(errors::heater_shaker_latch_open());
                }
                if hs.is_shaking() {
                    found.push(errors::heater_shaker_is_shaking());
                }
            }
            _ => {}
        }
    }

    // 2. Heater-shakers next door.
    let is_tiprack = ctx.labware(labware_id).is_some_and(|l| l.def.is_tiprack());
    for direction in Direction::ALL {
        let Some(neighbour) = deck::adjacent_slot(robot, &slot, direction) else {
            continue;
        };
        let Some(ModuleState::HeaterShaker(hs)) = state
            .module_in_slot(&neighbour)
            .and_then(|id| state.module_state(id))
        else {
            continue;
        };
        if hs.is_shaking() {
            found.push(errors::heater_shaker_north_south_east_west_shaking());
        }
        if robot != RobotType::Ot2 {
            continue;
        }
        match direction {
            Direction::East | Direction::West => {
                if hs.latch_open == Some(true) {
                    found.push(errors::heater_shaker_east_west_latch_open());
                }
                if pipette.is_multi_channel() {
                    found.push(errors::heater_shaker_east_west_multi_channel());
                }
            }
            Direction::North | Direction::South => {
                if pipette.is_multi_channel() && !is_tiprack {
                    found.push(errors::heater_shaker_north_south_of_non_tiprack_with_multi_channel());
                }
            }
        }
    }

    // 3. 96-channel head in column mode sweeping over its neighbours.
    if pipette.is_96_channel()
        && state.nozzles(&pipette.id) == NozzleConfiguration::Column
        && possible_pipette_collision(&pipette.id, labware_id, well, ctx, state)
    {
        found.push(errors::possible_pipette_collision());
    }

    found
}

/// Height of the top of a labware above the deck, counting everything under it.
pub fn labware_stack_height(labware_id: &str, ctx: &InvariantContext, state: &RobotState) -> f64 {
    let mut height = 0.0;
    let mut current = labware_id.to_string();
    let mut seen = BTreeSet::new();
    while seen.insert(current.clone()) {
        if let Some(entity) = ctx.labware(&current) {
            height += entity.def.dimensions.z_dimension;
        }
        match state.labware_location(&current) {
            Some(LabwareLocation::Labware(parent)) => current = parent.clone(),
            Some(LabwareLocation::Module(module_id)) => {
                height += ctx.module(module_id).map_or(0.0, |m| m.model.overall_height());
                break;
            }
            _ => break,
        }
    }
    height
}

/// Tallest object standing in each deck slot other than `except`.
fn slot_heights(except: &str, ctx: &InvariantContext, state: &RobotState) -> Vec<(String, f64)> {
    let mut heights: Vec<(String, f64)> = Vec::new();
    let mut raise = |slot: String, h: f64| match heights.iter_mut().find(|(s, _)| *s == slot) {
        Some((_, current)) => *current = current.max(h),
        None => heights.push((slot, h)),
    };

    for id in state.labware.keys() {
        if let Some(slot) = state.labware_slot(id)
            && slot != except
        {
            raise(slot, labware_stack_height(id, ctx, state));
        }
    }
    for (id, module) in state.modules.iter() {
        if module.slot != except {
            let h = ctx.module(id).map_or(0.0, |m| m.model.overall_height());
            raise(module.slot.clone(), h);
        }
    }
    for equipment in ctx.additional_equipment_entities.values() {
        if equipment.kind == EquipmentKind::TrashBin
            && let Some(slot) = &equipment.location
            && slot != except
        {
            raise(slot.clone(), TRASH_BIN_HEIGHT);
        }
    }
    heights
}

/// Footprint of a 96-channel head in column mode whose A12 nozzle is over `well_position`.
///
/// The eleven unused nozzle columns hang to the left of the active one.
pub fn column_mode_head_footprint(well_position: Vec2) -> Aabb2d {
    let min = Vec2::new(
        well_position.x - 11.0 * NOZZLE_PITCH - HEAD_OVERHANG_X,
        well_position.y - 7.0 * NOZZLE_PITCH - HEAD_OVERHANG_Y,
    );
    let max = Vec2::new(
        well_position.x + HEAD_OVERHANG_X,
        well_position.y + HEAD_OVERHANG_Y,
    );
    Aabb2d { min, max }
}

/// True when the column-mode head over `well` would clip something taller than
/// the tip reaches in a neighbouring slot.
pub fn possible_pipette_collision(
    pipette_id: &str,
    labware_id: &str,
    well: &str,
    ctx: &InvariantContext,
    state: &RobotState,
) -> bool {
    let robot = ctx.robot_type;
    let Some(slot) = state.labware_slot(labware_id) else {
        return false;
    };
    let Some(origin) = deck::slot_origin(robot, &slot) else {
        return false;
    };
    let Some(well_def) = ctx.labware(labware_id).and_then(|l| l.def.well(well)) else {
        return false;
    };
    let head = column_mode_head_footprint(origin + Vec2::new(well_def.x as f32, well_def.y as f32));

    let tip_length = state.loaded_tip(pipette_id).map_or(0.0, |t| t.length);
    let clearance = labware_stack_height(labware_id, ctx, state) + tip_length;

    slot_heights(&slot, ctx, state).into_iter().any(|(other, height)| {
        height > clearance
            && deck::slot_footprint(robot, &other).is_some_and(|fp| fp.intersects(&head))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_footprint_hangs_left_and_back_of_primary_nozzle() {
        let fp = column_mode_head_footprint(Vec2::new(200.0, 100.0));
        assert_eq!(fp.max, Vec2::new(236.0, 127.0));
        assert_eq!(fp.min, Vec2::new(200.0 - 99.0 - 36.0, 100.0 - 63.0 - 27.0));
    }
}
