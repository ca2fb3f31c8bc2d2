//! One-to-one transfers between paired source and destination wells.

use super::utils::{
    LiquidHandlingArgs, MixSettings, TipPolicy, blowout_at, check_volume, split_liquid, touch_tip_at,
};
use crate::creator::{CommandCreatorResult, fail, reduce_command_creators};
use crate::entities::InvariantContext;
use crate::errors;
use crate::robot_state::RobotState;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferArgs {
    #[serde(flatten)]
    pub common: LiquidHandlingArgs,
    pub source_wells: Vec<String>,
    pub dest_wells: Vec<String>,
    #[serde(default)]
    pub mix_in_destination: Option<MixSettings>,
}

/// Pairs source and destination wells, repeating a lone well on either side.
pub fn pair_wells(sources: &[String], dests: &[String]) -> Option<Vec<(String, String)>> {
    let (sources, dests): (Vec<String>, Vec<String>) = match (sources.len(), dests.len()) {
        (s, d) if s == d => (sources.to_vec(), dests.to_vec()),
        (1, d) => (vec![sources[0].clone(); d], dests.to_vec()),
        (s, 1) => (sources.to_vec(), vec![dests[0].clone(); s]),
        _ => return None,
    };
    Some(sources.into_iter().zip(dests).collect())
}

/// Whether cycle `i` of `ops` starts with a fresh tip.
fn needs_new_tip(policy: TipPolicy, ops: &[(String, String, f64)], i: usize) -> bool {
    match policy {
        TipPolicy::Always => true,
        TipPolicy::Once => i == 0,
        TipPolicy::Never => false,
        TipPolicy::PerSource => i == 0 || ops[i - 1].0 != ops[i].0,
        TipPolicy::PerDest => i == 0 || ops[i - 1].1 != ops[i].1,
    }
}

/// Moves `volume` from each source well to its paired destination.
///
/// Volumes above the tip capacity are split into several aspirate cycles.
pub fn transfer(args: &TransferArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let common = &args.common;
    let Some(pipette) = ctx.pipette(&common.pipette_id) else {
        return fail(errors::pipette_does_not_exist(&common.pipette_id));
    };
    check_volume("transfer", common.volume)?;
    let Some(pairs) = pair_wells(&args.source_wells, &args.dest_wells) else {
        return fail(errors::mismatched_well_count(
            args.source_wells.len(),
            args.dest_wells.len(),
        ));
    };

    let tip_max = common.tip_max_volume(ctx, pipette);
    let air_gap = common.aspirate_air_gap();
    let capacity = tip_max - air_gap;
    if capacity <= 0.0 {
        return fail(errors::pipette_volume_exceeded("aspirate", common.volume + air_gap, tip_max));
    }
    let Some(parts) = split_liquid(common.volume, capacity) else {
        return fail(errors::pipette_volume_exceeded("transfer", common.volume, capacity));
    };
    let rates = common.rates(pipette);

    let ops: Vec<(String, String, f64)> = pairs
        .into_iter()
        .flat_map(|(src, dst)| parts.iter().map(move |v| (src.clone(), dst.clone(), *v)))
        .collect();
    tracing::debug!(
        pipette = %common.pipette_id,
        cycles = ops.len(),
        capacity,
        "planned transfer"
    );

    let mut creators = Vec::new();
    creators.extend(common.configure_for_volume(pipette));

    for (i, (src, dst, volume)) in ops.iter().enumerate() {
        let new_tip = needs_new_tip(common.change_tip, &ops, i);
        if new_tip {
            creators.push(common.replace_tip());
            if common.pre_wet_tip {
                creators.extend(common.pre_wet(src, *volume, rates));
            }
        }
        if let Some(mix) = &common.mix_before_aspirate {
            creators.extend(common.mix_in(&common.source_labware, src, mix, rates));
        }
        creators.extend(common.aspirate_phase(src, *volume, rates));
        creators.extend(common.dispense_phase(dst, *volume + air_gap, rates));
        if let Some(mix) = &args.mix_in_destination {
            creators.extend(common.mix_in(&common.dest_labware, dst, mix, rates));
        }
        if let Some(touch) = &common.touch_tip_after_dispense {
            creators.push(touch_tip_at(&common.pipette_id, &common.dest_labware, dst, touch));
        }
        if let Some(location) = &common.blowout {
            creators.push(blowout_at(
                &common.pipette_id,
                location,
                (&common.source_labware, src),
                (&common.dest_labware, dst),
                common.blowout_offset_from_top,
                rates.blowout,
            ));
        }
        let tip_reused = if i + 1 < ops.len() {
            !needs_new_tip(common.change_tip, &ops, i + 1)
        } else {
            common.change_tip == TipPolicy::Never
        };
        creators.extend(common.finish_cycle(dst, rates, tip_reused));
    }
    if common.change_tip != TipPolicy::Never {
        creators.push(common.drop_tip());
    }

    reduce_command_creators(creators, ctx, state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wells(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lone_source_is_repeated() {
        let pairs = pair_wells(&wells(&["A1"]), &wells(&["B1", "B2"])).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|(s, _)| s == "A1"));
    }

    #[test]
    fn uneven_lists_do_not_pair() {
        assert!(pair_wells(&wells(&["A1", "A2"]), &wells(&["B1", "B2", "B3"])).is_none());
    }
}
