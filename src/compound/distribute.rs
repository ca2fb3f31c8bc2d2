//! One source into many destinations, one aspirate feeding several dispenses.

use super::trash::{BlowOutInTrashArgs, blow_out_in_trash};
use super::utils::{LiquidHandlingArgs, TipPolicy, blowout_at, check_volume, touch_tip_at};
use crate::atomic;
use crate::command::{BlowoutParams, WellLocation};
use crate::creator::{CommandCreatorResult, CurriedCommandCreator, curry, fail, reduce_command_creators};
use crate::entities::InvariantContext;
use crate::errors;
use crate::robot_state::RobotState;
use serde::{Deserialize, Serialize};

/// Where the disposal volume ends up. Never a destination well.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisposalLocation {
    SourceWell,
    /// Trash bin or waste chute equipment id.
    Trash(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposalSettings {
    pub volume: f64,
    pub location: DisposalLocation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeArgs {
    #[serde(flatten)]
    pub common: LiquidHandlingArgs,
    pub source_well: String,
    pub dest_wells: Vec<String>,
    #[serde(default)]
    pub disposal: Option<DisposalSettings>,
}

/// Destination wells one aspirate can feed:
/// `floor((tip max − air gap − disposal) / per well)`.
pub fn distribute_chunk_size(tip_max_volume: f64, air_gap: f64, disposal: f64, per_well_volume: f64) -> usize {
    if per_well_volume <= 0.0 {
        return 0;
    }
    ((tip_max_volume - air_gap - disposal) / per_well_volume)
        .floor()
        .max(0.0) as usize
}

/// Per-source tips mean one tip; per-destination means a new tip per chunk.
fn effective_policy(policy: TipPolicy) -> TipPolicy {
    match policy {
        TipPolicy::PerSource => TipPolicy::Once,
        TipPolicy::PerDest => TipPolicy::Always,
        other => other,
    }
}

fn dispose(args: &DistributeArgs, disposal: &DisposalSettings, flow_rate: f64) -> CurriedCommandCreator {
    let common = &args.common;
    match &disposal.location {
        DisposalLocation::SourceWell => curry(
            atomic::blowout,
            BlowoutParams {
                pipette_id: common.pipette_id.clone(),
                labware_id: common.source_labware.clone(),
                well_name: args.source_well.clone(),
                well_location: WellLocation::top(common.blowout_offset_from_top),
                flow_rate,
            },
        ),
        DisposalLocation::Trash(equipment_id) => curry(
            blow_out_in_trash,
            BlowOutInTrashArgs {
                pipette_id: common.pipette_id.clone(),
                equipment_id: equipment_id.clone(),
                flow_rate,
            },
        ),
    }
}

/// Delivers `volume` from the source well to every destination well.
pub fn distribute(args: &DistributeArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let common = &args.common;
    let Some(pipette) = ctx.pipette(&common.pipette_id) else {
        return fail(errors::pipette_does_not_exist(&common.pipette_id));
    };
    check_volume("distribute", common.volume)?;
    let tip_max = common.tip_max_volume(ctx, pipette);
    let air_gap = common.aspirate_air_gap();
    let disposal_volume = args.disposal.as_ref().map_or(0.0, |d| d.volume.max(0.0));
    let chunk_size = distribute_chunk_size(tip_max, air_gap, disposal_volume, common.volume);
    if chunk_size == 0 {
        return fail(errors::pipette_volume_exceeded(
            "aspirate",
            common.volume + air_gap + disposal_volume,
            tip_max,
        ));
    }
    let policy = effective_policy(common.change_tip);
    let rates = common.rates(pipette);
    let src = args.source_well.as_str();
    let chunks: Vec<&[String]> = args.dest_wells.chunks(chunk_size).collect();
    tracing::debug!(
        pipette = %common.pipette_id,
        chunk_size,
        chunks = chunks.len(),
        disposal = disposal_volume,
        "planned distribute"
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
            if common.pre_wet_tip {
                creators.extend(common.pre_wet(src, common.volume, rates));
            }
        }
        if let Some(mix) = &common.mix_before_aspirate {
            creators.extend(common.mix_in(&common.source_labware, src, mix, rates));
        }

        let with_disposal = disposal_volume > 0.0 && (policy == TipPolicy::Always || c == 0);
        let aspirate_volume =
            common.volume * chunk.len() as f64 + if with_disposal { disposal_volume } else { 0.0 };
        creators.extend(common.aspirate_phase(src, aspirate_volume, rates));

        for (j, dst) in chunk.iter().enumerate() {
            let volume = if j == 0 { common.volume + air_gap } else { common.volume };
            creators.extend(common.dispense_phase(dst, volume, rates));
            if let Some(touch) = &common.touch_tip_after_dispense {
                creators.push(touch_tip_at(&common.pipette_id, &common.dest_labware, dst, touch));
            }
        }

        let last_dest = chunk.last().map_or(src, String::as_str);
        match (&args.disposal, with_disposal) {
            (Some(disposal), true) => creators.push(dispose(args, disposal, rates.blowout)),
            _ => {
                if let Some(location) = &common.blowout {
                    creators.push(blowout_at(
                        &common.pipette_id,
                        location,
                        (&common.source_labware, src),
                        (&common.dest_labware, last_dest),
                        common.blowout_offset_from_top,
                        rates.blowout,
                    ));
                }
            }
        }

        let tip_reused = if c + 1 < chunks.len() {
            policy != TipPolicy::Always
        } else {
            policy == TipPolicy::Never
        };
        creators.extend(common.finish_cycle(last_dest, rates, tip_reused));
    }
    if policy != TipPolicy::Never {
        creators.push(common.drop_tip());
    }

    reduce_command_creators(creators, ctx, state)
}
