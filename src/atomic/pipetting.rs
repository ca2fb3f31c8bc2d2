//! Creators that move a pipette into wells or move liquid.

use super::{require_pipette, require_tip};
use crate::command::{
    AddressableAreaParams, BlowoutParams, Command, InPlaceFlowParams, InPlaceVolumeParams,
    PipettingParams, WellTargetParams,
};
use crate::creator::{CommandCreatorErrors, CommandCreatorResult, emit, fail_if_any};
use crate::entities::{InvariantContext, PipetteEntity};
use crate::errors::{self, CommandCreatorError};
use crate::hazards;
use crate::robot_state::{RobotState, total_volume};

/// Labware access plus deck hazards for a well target.
fn well_target_errors(
    pipette: &PipetteEntity,
    labware_id: &str,
    well: &str,
    ctx: &InvariantContext,
    state: &RobotState,
) -> Vec<CommandCreatorError> {
    let access = hazards::check_labware_access(labware_id, ctx, state);
    if !access.is_empty() {
        return access;
    }
    hazards::pipetting_hazards(pipette, labware_id, well, ctx, state)
}

fn check_finite(action: &str, volume: f64) -> Result<(), CommandCreatorErrors> {
    if volume.is_finite() && volume >= 0.0 {
        Ok(())
    } else {
        Err(errors::invalid_volume(action, volume).into())
    }
}

/// Volume checks shared by aspirate and air gaps.
fn check_capacity(
    pipette: &PipetteEntity,
    action: &str,
    volume: f64,
    state: &RobotState,
) -> Result<(), CommandCreatorErrors> {
    check_finite(action, volume)?;
    let total = state.pipette_volume(&pipette.id) + volume;
    if total > pipette.spec.max_volume {
        return Err(errors::pipette_volume_exceeded(action, total, pipette.spec.max_volume).into());
    }
    if let Some(tip) = state.loaded_tip(&pipette.id)
        && total > tip.volume
    {
        return Err(errors::tip_volume_exceeded(action, total, tip.volume).into());
    }
    Ok(())
}

/// Draws liquid from a well into the tip.
pub fn aspirate(args: &PipettingParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let pipette = require_pipette(&args.pipette_id, ctx)?;
    require_tip(&args.pipette_id, state)?;
    fail_if_any(well_target_errors(pipette, &args.labware_id, &args.well_name, ctx, state))?;
    check_capacity(pipette, "aspirate", args.volume, state)?;

    let mut warnings = Vec::new();
    match state.well_liquid(&args.labware_id, &args.well_name) {
        Some(contents) if !contents.is_empty() => {
            if total_volume(contents) < args.volume {
                warnings.push(errors::aspirate_more_than_well_contents());
            }
        }
        _ => warnings.push(errors::aspirate_from_pristine_well()),
    }

    emit(vec![Command::Aspirate(args.clone())], warnings, ctx)
}

/// Pushes liquid out of the tip into a well. Warns when the well would overflow.
pub fn dispense(args: &PipettingParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let pipette = require_pipette(&args.pipette_id, ctx)?;
    require_tip(&args.pipette_id, state)?;
    fail_if_any(well_target_errors(pipette, &args.labware_id, &args.well_name, ctx, state))?;
    check_finite("dispense", args.volume)?;

    let mut warnings = Vec::new();
    let capacity = ctx
        .labware(&args.labware_id)
        .and_then(|l| l.def.well(&args.well_name))
        .map(|w| w.total_liquid_volume);
    let current = state
        .well_liquid(&args.labware_id, &args.well_name)
        .map_or(0.0, total_volume);
    if let Some(capacity) = capacity
        && current + args.volume > capacity
    {
        warnings.push(errors::over_max_well_volume());
    }

    emit(vec![Command::Dispense(args.clone())], warnings, ctx)
}

/// Empties the tip over a well.
pub fn blowout(args: &BlowoutParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let pipette = require_pipette(&args.pipette_id, ctx)?;
    require_tip(&args.pipette_id, state)?;
    fail_if_any(well_target_errors(pipette, &args.labware_id, &args.well_name, ctx, state))?;
    emit(vec![Command::Blowout(args.clone())], Vec::new(), ctx)
}

/// Touches the tip against the well walls to shed droplets.
pub fn touch_tip(args: &WellTargetParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let pipette = require_pipette(&args.pipette_id, ctx)?;
    require_tip(&args.pipette_id, state)?;
    fail_if_any(well_target_errors(pipette, &args.labware_id, &args.well_name, ctx, state))?;
    emit(vec![Command::TouchTip(args.clone())], Vec::new(), ctx)
}

/// Moving over a well does not need a tip.
pub fn move_to_well(args: &WellTargetParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let pipette = require_pipette(&args.pipette_id, ctx)?;
    fail_if_any(well_target_errors(pipette, &args.labware_id, &args.well_name, ctx, state))?;
    emit(vec![Command::MoveToWell(args.clone())], Vec::new(), ctx)
}

/// Draws air at the current position.
pub fn air_gap_in_place(
    args: &InPlaceVolumeParams,
    ctx: &InvariantContext,
    state: &RobotState,
) -> CommandCreatorResult {
    let pipette = require_pipette(&args.pipette_id, ctx)?;
    require_tip(&args.pipette_id, state)?;
    check_capacity(pipette, "air gap", args.volume, state)?;
    emit(vec![Command::AirGapInPlace(args.clone())], Vec::new(), ctx)
}

/// Empties the tip at the current position.
pub fn blow_out_in_place(
    args: &InPlaceFlowParams,
    ctx: &InvariantContext,
    state: &RobotState,
) -> CommandCreatorResult {
    require_pipette(&args.pipette_id, ctx)?;
    require_tip(&args.pipette_id, state)?;
    emit(vec![Command::BlowOutInPlace(args.clone())], Vec::new(), ctx)
}

/// Moves over a named deck area such as a trash bin or waste chute.
pub fn move_to_addressable_area(
    args: &AddressableAreaParams,
    ctx: &InvariantContext,
    _state: &RobotState,
) -> CommandCreatorResult {
    require_pipette(&args.pipette_id, ctx)?;
    emit(vec![Command::MoveToAddressableArea(args.clone())], Vec::new(), ctx)
}
