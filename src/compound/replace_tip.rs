//! Swapping the current tip for the next unused one.

use super::trash::{DropTipArgs, drop_tip};
use crate::atomic;
use crate::command::{ConfigureNozzleLayoutParams, NozzleLayoutParams, PickUpTipParams};
use crate::creator::{CommandCreatorResult, curry, fail, reduce_command_creators};
use crate::entities::InvariantContext;
use crate::errors;
use crate::robot_state::{LabwareLocation, NozzleConfiguration, RobotState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTipArgs {
    pub pipette_id: String,
    /// Tip rack definition URI; any rack the pipette accepts when absent.
    #[serde(default)]
    pub tiprack: Option<String>,
    pub drop_tip_location: String,
    /// Nozzle layout to switch to before picking up.
    #[serde(default)]
    pub nozzles: Option<NozzleConfiguration>,
}

/// Rack and well to pick `active_tips` tips from.
///
/// Racks are scanned in declared order, wells column by column. A single tip
/// takes the first present well, eight tips need a full column, a whole head
/// needs a full rack.
pub fn next_tip(
    tiprack_uris: &[String],
    active_tips: usize,
    ctx: &InvariantContext,
    state: &RobotState,
) -> Option<(String, String)> {
    for (id, labware) in &ctx.labware_entities {
        if !tiprack_uris.contains(&labware.def_uri) || state.labware_slot(id).is_none() {
            continue;
        }
        let Some(rack) = state.tip_state.tipracks.get(id) else {
            continue;
        };
        let present = |w: &str| rack.get(w).copied().unwrap_or(false);
        let found = match active_tips {
            1 => labware.def.ordered_wells().find(|w| present(w)).map(str::to_string),
            8 => labware
                .def
                .ordering
                .iter()
                .find(|column| !column.is_empty() && column.iter().all(|w| present(w)))
                .and_then(|column| column.first().cloned()),
            _ => full_rack(rack).then(|| "A1".to_string()),
        };
        if let Some(well) = found {
            return Some((id.clone(), well));
        }
    }
    None
}

fn full_rack(rack: &BTreeMap<String, bool>) -> bool {
    !rack.is_empty() && rack.values().all(|present| *present)
}

/// Drops the current tip and picks up the next unused one.
pub fn replace_tip(args: &ReplaceTipArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let Some(pipette) = ctx.pipette(&args.pipette_id) else {
        return fail(errors::pipette_does_not_exist(&args.pipette_id));
    };
    let current = state.nozzles(&args.pipette_id);
    let nozzles = args.nozzles.unwrap_or(current);
    let active = nozzles.active_tips(pipette.channels());
    let uris = match &args.tiprack {
        Some(uri) => vec![uri.clone()],
        None => pipette.tiprack_def_uris.clone(),
    };

    let Some((tiprack_id, well)) = next_tip(&uris, active, ctx, state) else {
        return fail(errors::insufficient_tips(uris.first().map_or("", String::as_str)));
    };
    tracing::debug!(pipette = %args.pipette_id, tiprack = %tiprack_id, well = %well, "next tip");

    if pipette.is_96_channel() {
        let on_adapter = matches!(state.labware_location(&tiprack_id), Some(LabwareLocation::Labware(_)));
        match nozzles {
            NozzleConfiguration::All if !on_adapter => {
                return fail(errors::missing_adapter(&tiprack_id));
            }
            NozzleConfiguration::Column if on_adapter => {
                return fail(errors::remove_adapter(&tiprack_id));
            }
            _ => {}
        }
    }

    let mut creators = Vec::new();
    if state.has_tip(&args.pipette_id) {
        creators.push(curry(
            drop_tip,
            DropTipArgs {
                pipette_id: args.pipette_id.clone(),
                drop_tip_location: args.drop_tip_location.clone(),
            },
        ));
    }
    if pipette.is_multi_channel() && nozzles != current {
        let primary_nozzle = match nozzles {
            NozzleConfiguration::All => None,
            other => Some(other.primary_nozzle().to_string()),
        };
        creators.push(curry(
            atomic::configure_nozzle_layout,
            ConfigureNozzleLayoutParams {
                pipette_id: args.pipette_id.clone(),
                configuration_params: NozzleLayoutParams {
                    style: nozzles,
                    primary_nozzle,
                },
            },
        ));
    }
    creators.push(curry(
        atomic::pick_up_tip,
        PickUpTipParams {
            pipette_id: args.pipette_id.clone(),
            labware_id: tiprack_id,
            well_name: well,
        },
    ));
    reduce_command_creators(creators, ctx, state)
}
