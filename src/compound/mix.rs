//! Mixing in place: repeated aspirate/dispense cycles in each target well.

use super::replace_tip::{ReplaceTipArgs, replace_tip};
use super::utils::{
    BlowoutLocation, DelaySettings, FlowRates, MixUtilArgs, TipPolicy, TouchTipSettings, blowout_at,
    check_volume, default_offset_from_bottom, mix_util, touch_tip_at,
};
use crate::atomic;
use crate::command::ConfigureForVolumeParams;
use crate::creator::{CommandCreatorResult, curry, fail, reduce_command_creators};
use crate::entities::InvariantContext;
use crate::errors;
use crate::robot_state::{NozzleConfiguration, RobotState};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixArgs {
    pub pipette_id: String,
    pub labware_id: String,
    pub wells: Vec<String>,
    pub volume: f64,
    pub times: u32,
    pub change_tip: TipPolicy,
    #[serde(default)]
    pub tiprack: Option<String>,
    pub drop_tip_location: String,
    #[serde(default)]
    pub nozzles: Option<NozzleConfiguration>,
    #[serde(default)]
    pub aspirate_flow_rate: Option<f64>,
    #[serde(default)]
    pub dispense_flow_rate: Option<f64>,
    #[serde(default)]
    pub blowout_flow_rate: Option<f64>,
    #[serde(default = "default_offset_from_bottom")]
    pub aspirate_offset_from_bottom: f64,
    #[serde(default = "default_offset_from_bottom")]
    pub dispense_offset_from_bottom: f64,
    #[serde(default)]
    pub aspirate_delay: Option<DelaySettings>,
    #[serde(default)]
    pub dispense_delay: Option<DelaySettings>,
    #[serde(default)]
    pub touch_tip: Option<TouchTipSettings>,
    /// Source and destination both mean the mixed well here.
    #[serde(default)]
    pub blowout: Option<BlowoutLocation>,
    #[serde(default)]
    pub blowout_offset_from_top: f64,
}

/// Mixes every well in `args.wells`, honouring the tip policy.
///
/// Per-source and per-destination policies collapse to a new tip per well.
pub fn mix(args: &MixArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let Some(pipette) = ctx.pipette(&args.pipette_id) else {
        return fail(errors::pipette_does_not_exist(&args.pipette_id));
    };
    check_volume("mix", args.volume)?;
    let rates = FlowRates {
        aspirate: args
            .aspirate_flow_rate
            .unwrap_or(pipette.spec.default_aspirate_flow_rate),
        dispense: args
            .dispense_flow_rate
            .unwrap_or(pipette.spec.default_dispense_flow_rate),
        blowout: args
            .blowout_flow_rate
            .unwrap_or(pipette.spec.default_blow_out_flow_rate),
    };

    let mut creators = Vec::new();
    if pipette.is_low_volume() {
        creators.push(curry(
            atomic::configure_for_volume,
            ConfigureForVolumeParams {
                pipette_id: args.pipette_id.clone(),
                volume: args.volume,
            },
        ));
    }

    for (i, well) in args.wells.iter().enumerate() {
        let new_tip = match args.change_tip {
            TipPolicy::Always | TipPolicy::PerSource | TipPolicy::PerDest => true,
            TipPolicy::Once => i == 0,
            TipPolicy::Never => false,
        };
        if new_tip {
            creators.push(curry(
                replace_tip,
                ReplaceTipArgs {
                    pipette_id: args.pipette_id.clone(),
                    tiprack: args.tiprack.clone(),
                    drop_tip_location: args.drop_tip_location.clone(),
                    nozzles: args.nozzles,
                },
            ));
        }
        creators.extend(mix_util(MixUtilArgs {
            pipette_id: &args.pipette_id,
            labware_id: &args.labware_id,
            well,
            volume: args.volume,
            times: args.times,
            aspirate_offset_from_bottom: args.aspirate_offset_from_bottom,
            dispense_offset_from_bottom: args.dispense_offset_from_bottom,
            rates,
            aspirate_delay: args.aspirate_delay.as_ref(),
            dispense_delay: args.dispense_delay.as_ref(),
        }));
        if let Some(location) = &args.blowout {
            let target = (args.labware_id.as_str(), well.as_str());
            creators.push(blowout_at(
                &args.pipette_id,
                location,
                target,
                target,
                args.blowout_offset_from_top,
                rates.blowout,
            ));
        }
        if let Some(touch) = &args.touch_tip {
            creators.push(touch_tip_at(&args.pipette_id, &args.labware_id, well, touch));
        }
    }

    tracing::debug!(
        pipette = %args.pipette_id,
        wells = args.wells.len(),
        times = args.times,
        "planned mix"
    );
    reduce_command_creators(creators, ctx, state)
}
