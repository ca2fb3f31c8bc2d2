//! Many sources into one destination, several aspirates per dispense.

use super::utils::{LiquidHandlingArgs, MixSettings, TipPolicy, blowout_at, check_volume, touch_tip_at};
use crate::creator::{CommandCreatorResult, fail, reduce_command_creators};
use crate::entities::InvariantContext;
use crate::errors;
use crate::robot_state::RobotState;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidateArgs {
    #[serde(flatten)]
    pub common: LiquidHandlingArgs,
    pub source_wells: Vec<String>,
    pub dest_well: String,
    #[serde(default)]
    pub mix_in_destination: Option<MixSettings>,
}

/// Source wells one tip can collect before it must dispense.
///
/// Each aspirate carries its own air gap.
pub fn consolidate_chunk_size(tip_max_volume: f64, air_gap: f64, per_source_volume: f64) -> usize {
    let per_aspirate = per_source_volume + air_gap;
    if per_aspirate <= 0.0 {
        return 0;
    }
    (tip_max_volume / per_aspirate).floor().max(0.0) as usize
}

/// Per-source tips mean a new tip for every chunk; per-destination means one tip.
fn effective_policy(policy: TipPolicy) -> TipPolicy {
    match policy {
        TipPolicy::PerSource => TipPolicy::Always,
        TipPolicy::PerDest => TipPolicy::Once,
        other => other,
    }
}

/// Collects `volume` from every source well into the destination.
pub fn consolidate(args: &ConsolidateArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let common = &args.common;
    let Some(pipette) = ctx.pipette(&common.pipette_id) else {
        return fail(errors::pipette_does_not_exist(&common.pipette_id));
    };
    check_volume("consolidate", common.volume)?;
    let tip_max = common.tip_max_volume(ctx, pipette);
    let air_gap = common.aspirate_air_gap();
    let chunk_size = consolidate_chunk_size(tip_max, air_gap, common.volume);
    if chunk_size == 0 {
        return fail(errors::pipette_volume_exceeded("aspirate", common.volume + air_gap, tip_max));
    }
    let policy = effective_policy(common.change_tip);
    let rates = common.rates(pipette);
    let dest = args.dest_well.as_str();
    let chunks: Vec<&[String]> = args.source_wells.chunks(chunk_size).collect();
    tracing::debug!(
        pipette = %common.pipette_id,
        chunk_size,
        chunks = chunks.len(),
        "planned consolidate"
    );

    let mut creators = Vec::new();
    creators.extend(common.configure_for_volume(pipette));

    for (c, chunk) in chunks.iter().enumerate() {
        let new_tip = match policy {
            TipPolicy::Once => c == 0,
            TipPolicy::Never => false,
            _ => true,
        };
        if new_tip {
            creators.push(common.replace_tip());
        }
        for (j, src) in chunk.iter().enumerate() {
            if j == 0 {
                if new_tip && common.pre_wet_tip {
                    creators.extend(common.pre_wet(src, common.volume, rates));
                }
                if let Some(mix) = &common.mix_before_aspirate {
                    creators.extend(common.mix_in(&common.source_labware, src, mix, rates));
                }
            }
            creators.extend(common.aspirate_phase(src, common.volume, rates));
        }

        let total = chunk.len() as f64 * (common.volume + air_gap);
        creators.extend(common.dispense_phase(dest, total, rates));
        if let Some(mix) = &args.mix_in_destination {
            creators.extend(common.mix_in(&common.dest_labware, dest, mix, rates));
        }
        if let Some(touch) = &common.touch_tip_after_dispense {
            creators.push(touch_tip_at(&common.pipette_id, &common.dest_labware, dest, touch));
        }
        if let Some(location) = &common.blowout {
            let last_source = chunk.last().map_or(dest, String::as_str);
            creators.push(blowout_at(
                &common.pipette_id,
                location,
                (&common.source_labware, last_source),
                (&common.dest_labware, dest),
                common.blowout_offset_from_top,
                rates.blowout,
            ));
        }
        let tip_reused = if c + 1 < chunks.len() {
            policy != TipPolicy::Always
        } else {
            policy == TipPolicy::Never
        };
        creators.extend(common.finish_cycle(dest, rates, tip_reused));
    }
    if policy != TipPolicy::Never {
        creators.push(common.drop_tip());
    }

    reduce_command_creators(creators, ctx, state)
}
