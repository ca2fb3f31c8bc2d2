//! Routing tips and blow-outs into a trash bin or the waste chute.

use crate::atomic;
use crate::command::{AddressableAreaParams, InPlaceFlowParams, PipetteParams, WellOffset};
use crate::creator::{CommandCreatorResult, curry, fail, reduce_command_creators};
use crate::deck;
use crate::entities::{EquipmentKind, InvariantContext, PipetteEntity};
use crate::errors;
use crate::robot_state::RobotState;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTipArgs {
    pub pipette_id: String,
    /// Trash bin or waste chute equipment id.
    pub drop_tip_location: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlowOutInTrashArgs {
    pub pipette_id: String,
    pub equipment_id: String,
    pub flow_rate: f64,
}

/// Addressable area above a piece of disposal equipment.
fn disposal_area(equipment_id: &str, pipette: &PipetteEntity, ctx: &InvariantContext) -> Option<(EquipmentKind, String)> {
    let equipment = ctx.equipment(equipment_id)?;
    match equipment.kind {
        EquipmentKind::WasteChute => Some((
            EquipmentKind::WasteChute,
            deck::waste_chute_area(pipette.channels()).to_string(),
        )),
        EquipmentKind::TrashBin => {
            let slot = equipment.location.as_deref().unwrap_or("A3");
            Some((EquipmentKind::TrashBin, deck::trash_bin_area(ctx.robot_type, slot)))
        }
        EquipmentKind::Gripper | EquipmentKind::StagingArea => None,
    }
}

/// Drops the current tip into the trash. No-op without a tip.
pub fn drop_tip(args: &DropTipArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let Some(pipette) = ctx.pipette(&args.pipette_id) else {
        return fail(errors::pipette_does_not_exist(&args.pipette_id));
    };
    if !state.has_tip(&args.pipette_id) {
        return Ok(Default::default());
    }
    let Some((kind, area)) = disposal_area(&args.drop_tip_location, pipette, ctx) else {
        return fail(errors::drop_tip_location_does_not_exist(&args.drop_tip_location));
    };

    let move_params = AddressableAreaParams {
        pipette_id: args.pipette_id.clone(),
        addressable_area_name: area,
        offset: WellOffset::default(),
        alternate_drop_location: None,
    };
    let approach = match kind {
        EquipmentKind::TrashBin => curry(
            atomic::move_to_addressable_area_for_drop_tip,
            AddressableAreaParams {
                alternate_drop_location: Some(true),
                ..move_params
            },
        ),
        _ => curry(atomic::move_to_addressable_area, move_params),
    };
    reduce_command_creators(
        vec![
            approach,
            curry(
                atomic::drop_tip_in_place,
                PipetteParams {
                    pipette_id: args.pipette_id.clone(),
                },
            ),
        ],
        ctx,
        state,
    )
}

/// Moves over the trash and blows out whatever the tip holds.
pub fn blow_out_in_trash(args: &BlowOutInTrashArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let Some(pipette) = ctx.pipette(&args.pipette_id) else {
        return fail(errors::pipette_does_not_exist(&args.pipette_id));
    };
    let Some((_, area)) = disposal_area(&args.equipment_id, pipette, ctx) else {
        return fail(errors::equipment_does_not_exist(&args.equipment_id));
    };
    reduce_command_creators(
        vec![
            curry(
                atomic::move_to_addressable_area,
                AddressableAreaParams {
                    pipette_id: args.pipette_id.clone(),
                    addressable_area_name: area,
                    offset: WellOffset::default(),
                    alternate_drop_location: None,
                },
            ),
            curry(
                atomic::blow_out_in_place,
                InPlaceFlowParams {
                    pipette_id: args.pipette_id.clone(),
                    flow_rate: args.flow_rate,
                },
            ),
        ],
        ctx,
        state,
    )
}
