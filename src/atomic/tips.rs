//! Tip pickup, drop and pipette configuration.

use super::require_pipette;
use crate::command::{
    AddressableAreaParams, Command, ConfigureForVolumeParams, ConfigureNozzleLayoutParams,
    PickUpTipParams, PipetteParams,
};
use crate::creator::{CommandCreatorResult, emit, fail, fail_if_any};
use crate::entities::InvariantContext;
use crate::errors;
use crate::hazards;
use crate::robot_state::RobotState;

/// Picks up the tip in `args.well_name`; that well must still hold one.
pub fn pick_up_tip(args: &PickUpTipParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    require_pipette(&args.pipette_id, ctx)?;
    fail_if_any(hazards::check_labware_access(&args.labware_id, ctx, state))?;

    let present = state
        .tip_state
        .tipracks
        .get(&args.labware_id)
        .and_then(|rack| rack.get(&args.well_name))
        .copied()
        .unwrap_or(false);
    if !present {
        let uri = ctx.labware(&args.labware_id).map_or("", |l| l.def_uri.as_str());
        return fail(errors::insufficient_tips(uri));
    }
    emit(vec![Command::PickUpTip(args.clone())], Vec::new(), ctx)
}

/// Drops the tip at the current position.
pub fn drop_tip_in_place(args: &PipetteParams, ctx: &InvariantContext, _state: &RobotState) -> CommandCreatorResult {
    require_pipette(&args.pipette_id, ctx)?;
    emit(vec![Command::DropTipInPlace(args.clone())], Vec::new(), ctx)
}

/// Moves over a trash area ready to drop the tip.
pub fn move_to_addressable_area_for_drop_tip(
    args: &AddressableAreaParams,
    ctx: &InvariantContext,
    _state: &RobotState,
) -> CommandCreatorResult {
    require_pipette(&args.pipette_id, ctx)?;
    emit(vec![Command::MoveToAddressableAreaForDropTip(args.clone())], Vec::new(), ctx)
}

/// Selects which nozzles of a multi-channel pipette are active.
pub fn configure_nozzle_layout(
    args: &ConfigureNozzleLayoutParams,
    ctx: &InvariantContext,
    _state: &RobotState,
) -> CommandCreatorResult {
    require_pipette(&args.pipette_id, ctx)?;
    emit(vec![Command::ConfigureNozzleLayout(args.clone())], Vec::new(), ctx)
}

/// Switches a low-volume pipette into the mode for `args.volume`.
pub fn configure_for_volume(
    args: &ConfigureForVolumeParams,
    ctx: &InvariantContext,
    _state: &RobotState,
) -> CommandCreatorResult {
    require_pipette(&args.pipette_id, ctx)?;
    emit(vec![Command::ConfigureForVolume(args.clone())], Vec::new(), ctx)
}
