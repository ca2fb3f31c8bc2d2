//! Building blocks shared by the liquid-handling planners.

use super::replace_tip::{ReplaceTipArgs, replace_tip};
use super::trash::{BlowOutInTrashArgs, DropTipArgs, blow_out_in_trash, drop_tip};
use crate::atomic;
use crate::command::{
    BlowoutParams, ConfigureForVolumeParams, InPlaceVolumeParams, PipettingParams,
    WaitForDurationParams, WellLocation, WellTargetParams,
};
use crate::creator::{CommandCreatorErrors, CurriedCommandCreator, curry};
use crate::entities::{InvariantContext, PipetteEntity};
use crate::errors;
use crate::robot_state::NozzleConfiguration;
use serde::{Deserialize, Serialize};

/// Default height above the well bottom for aspirate and dispense, in mm.
pub const DEFAULT_OFFSET_FROM_BOTTOM: f64 = 1.0;

pub(crate) fn default_offset_from_bottom() -> f64 {
    DEFAULT_OFFSET_FROM_BOTTOM
}

/// When a fresh tip is picked up during a multi-well operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TipPolicy {
    /// New tip for every aspirate cycle.
    #[default]
    Always,
    /// One tip for the whole operation.
    Once,
    /// Keep whatever tip the pipette already carries.
    Never,
    /// New tip whenever the source well changes.
    PerSource,
    /// New tip whenever the destination well changes.
    PerDest,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MixSettings {
    pub volume: f64,
    pub times: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelaySettings {
    pub seconds: f64,
    /// Move here before waiting.
    #[serde(default)]
    pub mm_from_bottom: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchTipSettings {
    /// Negative values touch below the rim.
    pub mm_from_top: f64,
}

/// Where leftover liquid is blown out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlowoutLocation {
    SourceWell,
    DestWell,
    /// A trash bin or waste chute, by equipment id.
    Equipment(String),
}

/// Options shared by transfer, consolidate and distribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidHandlingArgs {
    pub pipette_id: String,
    /// Volume moved per destination (transfer, distribute) or per source (consolidate), µL.
    pub volume: f64,
    pub source_labware: String,
    pub dest_labware: String,
    pub change_tip: TipPolicy,
    /// Tip rack definition URI to pick from; any rack the pipette accepts when absent.
    #[serde(default)]
    pub tiprack: Option<String>,
    /// Trash bin or waste chute equipment id.
    pub drop_tip_location: String,
    #[serde(default)]
    pub nozzles: Option<NozzleConfiguration>,

    #[serde(default)]
    pub pre_wet_tip: bool,
    #[serde(default)]
    pub mix_before_aspirate: Option<MixSettings>,
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
    pub touch_tip_after_aspirate: Option<TouchTipSettings>,
    #[serde(default)]
    pub touch_tip_after_dispense: Option<TouchTipSettings>,
    #[serde(default)]
    pub aspirate_air_gap: Option<f64>,
    #[serde(default)]
    pub dispense_air_gap: Option<f64>,
    #[serde(default)]
    pub blowout: Option<BlowoutLocation>,
    #[serde(default)]
    pub blowout_offset_from_top: f64,
}

impl LiquidHandlingArgs {
    /// Minimal arguments with every optional phase switched off.
    pub fn new(
        pipette_id: impl Into<String>,
        volume: f64,
        source_labware: impl Into<String>,
        dest_labware: impl Into<String>,
        drop_tip_location: impl Into<String>,
    ) -> Self {
        Self {
            pipette_id: pipette_id.into(),
            volume,
            source_labware: source_labware.into(),
            dest_labware: dest_labware.into(),
            change_tip: TipPolicy::Always,
            tiprack: None,
            drop_tip_location: drop_tip_location.into(),
            nozzles: None,
            pre_wet_tip: false,
            mix_before_aspirate: None,
            aspirate_flow_rate: None,
            dispense_flow_rate: None,
            blowout_flow_rate: None,
            aspirate_offset_from_bottom: DEFAULT_OFFSET_FROM_BOTTOM,
            dispense_offset_from_bottom: DEFAULT_OFFSET_FROM_BOTTOM,
            aspirate_delay: None,
            dispense_delay: None,
            touch_tip_after_aspirate: None,
            touch_tip_after_dispense: None,
            aspirate_air_gap: None,
            dispense_air_gap: None,
            blowout: None,
            blowout_offset_from_top: 0.0,
        }
    }

    pub fn with_change_tip(mut self, policy: TipPolicy) -> Self {
        self.change_tip = policy;
        self
    }

    pub fn rates(&self, pipette: &PipetteEntity) -> FlowRates {
        FlowRates {
            aspirate: self
                .aspirate_flow_rate
                .unwrap_or(pipette.spec.default_aspirate_flow_rate),
            dispense: self
                .dispense_flow_rate
                .unwrap_or(pipette.spec.default_dispense_flow_rate),
            blowout: self
                .blowout_flow_rate
                .unwrap_or(pipette.spec.default_blow_out_flow_rate),
        }
    }

    pub fn aspirate_air_gap(&self) -> f64 {
        self.aspirate_air_gap.unwrap_or(0.0).max(0.0)
    }

    pub fn dispense_air_gap(&self) -> f64 {
        self.dispense_air_gap.unwrap_or(0.0).max(0.0)
    }

    /// Capacity of the pipette fitted with the tips this operation will use.
    pub fn tip_max_volume(&self, ctx: &InvariantContext, pipette: &PipetteEntity) -> f64 {
        let uri = self
            .tiprack
            .as_deref()
            .or(pipette.tiprack_def_uris.first().map(String::as_str));
        uri.and_then(|u| ctx.pipette_with_tip_max_volume(&pipette.id, u))
            .unwrap_or(pipette.spec.max_volume)
    }

    pub(crate) fn replace_tip(&self) -> CurriedCommandCreator {
        curry(
            replace_tip,
            ReplaceTipArgs {
                pipette_id: self.pipette_id.clone(),
                tiprack: self.tiprack.clone(),
                drop_tip_location: self.drop_tip_location.clone(),
                nozzles: self.nozzles,
            },
        )
    }

    pub(crate) fn drop_tip(&self) -> CurriedCommandCreator {
        curry(
            drop_tip,
            DropTipArgs {
                pipette_id: self.pipette_id.clone(),
                drop_tip_location: self.drop_tip_location.clone(),
            },
        )
    }

    /// Leading `configureForVolume` for pipettes that need one.
    pub(crate) fn configure_for_volume(&self, pipette: &PipetteEntity) -> Option<CurriedCommandCreator> {
        pipette.is_low_volume().then(|| {
            curry(
                atomic::configure_for_volume,
                ConfigureForVolumeParams {
                    pipette_id: self.pipette_id.clone(),
                    volume: self.volume,
                },
            )
        })
    }

    /// A single mix cycle that wets a fresh tip in the source well.
    pub(crate) fn pre_wet(&self, well: &str, volume: f64, rates: FlowRates) -> Vec<CurriedCommandCreator> {
        self.mix_in(&self.source_labware, well, &MixSettings { volume, times: 1 }, rates)
    }

    pub(crate) fn mix_in(
        &self,
        labware_id: &str,
        well: &str,
        settings: &MixSettings,
        rates: FlowRates,
    ) -> Vec<CurriedCommandCreator> {
        mix_util(MixUtilArgs {
            pipette_id: &self.pipette_id,
            labware_id,
            well,
            volume: settings.volume,
            times: settings.times,
            aspirate_offset_from_bottom: self.aspirate_offset_from_bottom,
            dispense_offset_from_bottom: self.dispense_offset_from_bottom,
            rates,
            aspirate_delay: self.aspirate_delay.as_ref(),
            dispense_delay: self.dispense_delay.as_ref(),
        })
    }

    /// Aspirate from the source, then the configured delay, touch tip and air gap.
    pub(crate) fn aspirate_phase(&self, well: &str, volume: f64, rates: FlowRates) -> Vec<CurriedCommandCreator> {
        let labware = &self.source_labware;
        let mut creators = vec![aspirate_at(
            &self.pipette_id,
            labware,
            well,
            volume,
            self.aspirate_offset_from_bottom,
            rates.aspirate,
        )];
        if let Some(delay) = &self.aspirate_delay {
            creators.extend(delay_at(&self.pipette_id, labware, well, delay));
        }
        if let Some(touch) = &self.touch_tip_after_aspirate {
            creators.push(touch_tip_at(&self.pipette_id, labware, well, touch));
        }
        let air_gap = self.aspirate_air_gap();
        if air_gap > 0.0 {
            creators.extend(air_gap_at(&self.pipette_id, labware, well, air_gap, rates.aspirate));
        }
        creators
    }

    /// Dispense into the destination, then the configured delay.
    pub(crate) fn dispense_phase(&self, well: &str, volume: f64, rates: FlowRates) -> Vec<CurriedCommandCreator> {
        let labware = &self.dest_labware;
        let mut creators = vec![dispense_at(
            &self.pipette_id,
            labware,
            well,
            volume,
            self.dispense_offset_from_bottom,
            rates.dispense,
        )];
        if let Some(delay) = &self.dispense_delay {
            creators.extend(delay_at(&self.pipette_id, labware, well, delay));
        }
        creators
    }

    /// Air gap over the destination followed by a tip drop.
    ///
    /// Only a tip that is about to be discarded gets the gap: air left in a
    /// reused tip would count against the next aspirate.
    pub(crate) fn finish_cycle(&self, dest_well: &str, rates: FlowRates, tip_reused: bool) -> Vec<CurriedCommandCreator> {
        let air_gap = self.dispense_air_gap();
        if air_gap <= 0.0 || tip_reused {
            return Vec::new();
        }
        let mut creators = air_gap_at(&self.pipette_id, &self.dest_labware, dest_well, air_gap, rates.aspirate);
        creators.push(self.drop_tip());
        creators
    }
}

/// Resolved flow rates in µL/s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowRates {
    pub aspirate: f64,
    pub dispense: f64,
    pub blowout: f64,
}

/// Most aspirate cycles a single well pair may be split into.
pub const MAX_SPLIT_PARTS: usize = 1_000;

/// Rejects volumes that are negative, zero or not finite.
pub(crate) fn check_volume(action: &str, volume: f64) -> Result<(), CommandCreatorErrors> {
    if volume.is_finite() && volume > 0.0 {
        Ok(())
    } else {
        Err(errors::invalid_volume(action, volume).into())
    }
}

/// Splits `volume` into sub-volumes no larger than `max`.
///
/// Avoids a tiny trailing sub-volume: two equal halves when under twice the
/// maximum, otherwise full chunks with the last full chunk and the remainder
/// rebalanced into two equal halves. `None` when either input is not a finite
/// positive number or the split would need more than [`MAX_SPLIT_PARTS`].
pub fn split_liquid(volume: f64, max: f64) -> Option<Vec<f64>> {
    if !(volume.is_finite() && volume > 0.0 && max.is_finite() && max > 0.0) {
        return None;
    }
    if volume <= max {
        return Some(vec![volume]);
    }
    if volume < 2.0 * max {
        return Some(vec![volume / 2.0, volume / 2.0]);
    }
    let parts = (volume / max).floor();
    if parts > MAX_SPLIT_PARTS as f64 {
        return None;
    }
    let full = parts as usize;
    let remainder = volume - full as f64 * max;
    if remainder <= f64::EPSILON * volume.max(1.0) {
        return Some(vec![max; full]);
    }
    let mut out = vec![max; full - 1];
    let last = (max + remainder) / 2.0;
    out.push(last);
    out.push(last);
    Some(out)
}

pub(crate) fn aspirate_at(
    pipette_id: &str,
    labware_id: &str,
    well: &str,
    volume: f64,
    offset_from_bottom: f64,
    flow_rate: f64,
) -> CurriedCommandCreator {
    curry(
        atomic::aspirate,
        PipettingParams {
            pipette_id: pipette_id.to_string(),
            volume,
            labware_id: labware_id.to_string(),
            well_name: well.to_string(),
            well_location: WellLocation::bottom(offset_from_bottom),
            flow_rate,
        },
    )
}

pub(crate) fn dispense_at(
    pipette_id: &str,
    labware_id: &str,
    well: &str,
    volume: f64,
    offset_from_bottom: f64,
    flow_rate: f64,
) -> CurriedCommandCreator {
    curry(
        atomic::dispense,
        PipettingParams {
            pipette_id: pipette_id.to_string(),
            volume,
            labware_id: labware_id.to_string(),
            well_name: well.to_string(),
            well_location: WellLocation::bottom(offset_from_bottom),
            flow_rate,
        },
    )
}

/// Optional move to `mm_from_bottom`, then a timed wait.
pub(crate) fn delay_at(
    pipette_id: &str,
    labware_id: &str,
    well: &str,
    delay: &DelaySettings,
) -> Vec<CurriedCommandCreator> {
    let mut creators = Vec::new();
    if let Some(mm) = delay.mm_from_bottom {
        creators.push(curry(
            atomic::move_to_well,
            WellTargetParams {
                pipette_id: pipette_id.to_string(),
                labware_id: labware_id.to_string(),
                well_name: well.to_string(),
                well_location: WellLocation::bottom(mm),
            },
        ));
    }
    creators.push(curry(
        atomic::wait_for_duration,
        WaitForDurationParams {
            seconds: delay.seconds,
            message: None,
        },
    ));
    creators
}

pub(crate) fn touch_tip_at(
    pipette_id: &str,
    labware_id: &str,
    well: &str,
    settings: &TouchTipSettings,
) -> CurriedCommandCreator {
    curry(
        atomic::touch_tip,
        WellTargetParams {
            pipette_id: pipette_id.to_string(),
            labware_id: labware_id.to_string(),
            well_name: well.to_string(),
            well_location: WellLocation::top(settings.mm_from_top),
        },
    )
}

/// Rises to the well top and draws in air.
pub(crate) fn air_gap_at(
    pipette_id: &str,
    labware_id: &str,
    well: &str,
    volume: f64,
    flow_rate: f64,
) -> Vec<CurriedCommandCreator> {
    vec![
        curry(
            atomic::move_to_well,
            WellTargetParams {
                pipette_id: pipette_id.to_string(),
                labware_id: labware_id.to_string(),
                well_name: well.to_string(),
                well_location: WellLocation::top(0.0),
            },
        ),
        curry(
            atomic::air_gap_in_place,
            InPlaceVolumeParams {
                pipette_id: pipette_id.to_string(),
                volume,
                flow_rate,
            },
        ),
    ]
}

/// Parameters for one mix cycle set in a single well.
#[derive(Clone, Debug)]
pub(crate) struct MixUtilArgs<'a> {
    pub pipette_id: &'a str,
    pub labware_id: &'a str,
    pub well: &'a str,
    pub volume: f64,
    pub times: u32,
    pub aspirate_offset_from_bottom: f64,
    pub dispense_offset_from_bottom: f64,
    pub rates: FlowRates,
    pub aspirate_delay: Option<&'a DelaySettings>,
    pub dispense_delay: Option<&'a DelaySettings>,
}

/// `times` × {aspirate, delay, dispense, delay} in one well.
pub(crate) fn mix_util(args: MixUtilArgs<'_>) -> Vec<CurriedCommandCreator> {
    let mut creators = Vec::new();
    for _ in 0..args.times {
        creators.push(aspirate_at(
            args.pipette_id,
            args.labware_id,
            args.well,
            args.volume,
            args.aspirate_offset_from_bottom,
            args.rates.aspirate,
        ));
        if let Some(delay) = args.aspirate_delay {
            creators.extend(delay_at(args.pipette_id, args.labware_id, args.well, delay));
        }
        creators.push(dispense_at(
            args.pipette_id,
            args.labware_id,
            args.well,
            args.volume,
            args.dispense_offset_from_bottom,
            args.rates.dispense,
        ));
        if let Some(delay) = args.dispense_delay {
            creators.extend(delay_at(args.pipette_id, args.labware_id, args.well, delay));
        }
    }
    creators
}

/// Blow out at `location`; source and destination wells resolve to the given wells.
pub(crate) fn blowout_at(
    pipette_id: &str,
    location: &BlowoutLocation,
    source: (&str, &str),
    dest: (&str, &str),
    offset_from_top: f64,
    flow_rate: f64,
) -> CurriedCommandCreator {
    let (labware_id, well) = match location {
        BlowoutLocation::SourceWell => source,
        BlowoutLocation::DestWell => dest,
        BlowoutLocation::Equipment(equipment_id) => {
            return curry(
                blow_out_in_trash,
                BlowOutInTrashArgs {
                    pipette_id: pipette_id.to_string(),
                    equipment_id: equipment_id.clone(),
                    flow_rate,
                },
            );
        }
    };
    curry(
        atomic::blowout,
        BlowoutParams {
            pipette_id: pipette_id.to_string(),
            labware_id: labware_id.to_string(),
            well_name: well.to_string(),
            well_location: WellLocation::top(offset_from_top),
            flow_rate,
        },
    )
}
