//! Simulated device snapshot at one point in the timeline.
//!
//! A [`RobotState`] is never mutated once it has been handed out. Each section
//! sits behind an [`Arc`] so deriving the next snapshot only copies the sections
//! a command actually touches (see [`crate::advance`]).

use crate::entities::{InvariantContext, ModuleType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Liquid id used to account for air drawn into a tip.
pub const AIR: &str = "__air__";

/// Per-liquid volume held in one well or one tip.
pub type LocationLiquidState = BTreeMap<String, LiquidVolume>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidVolume {
    /// µL.
    pub volume: f64,
}

/// Total volume held at a location, air included.
pub fn total_volume(location: &LocationLiquidState) -> f64 {
    location.values().map(|v| v.volume).sum()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mount {
    Left,
    Right,
}

/// Which nozzles of a multi-channel pipette are in use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NozzleConfiguration {
    #[default]
    All,
    /// One column of 8 nozzles on a 96-channel head, primary nozzle A12.
    Column,
    Single,
}

impl NozzleConfiguration {
    /// Number of tips in use for a pipette with `channels` channels.
    pub fn active_tips(self, channels: u8) -> usize {
        match (self, channels) {
            (_, 1) | (Self::Single, _) => 1,
            (Self::Column, _) => 8,
            (Self::All, c) => c as usize,
        }
    }

    /// Nozzle the pipette positions over the target well.
    pub fn primary_nozzle(self) -> &'static str {
        match self {
            Self::Column => "A12",
            Self::All | Self::Single => "A1",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipetteTemporalProperties {
    pub mount: Mount,
    #[serde(default)]
    pub nozzles: NozzleConfiguration,
}

/// Where a labware rests.
///
/// Labware may sit on other labware (adapters), which may sit on a module,
/// which occupies a deck slot. Each placeable item has exactly one parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabwareLocation {
    Slot(String),
    Module(String),
    Labware(String),
    OffDeck,
    /// Discarded through the waste chute. Terminal.
    WasteChute,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareTemporalProperties {
    pub location: LabwareLocation,
}

/// Where a labware ends up once its chain of parents has been followed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeckPlacement {
    Slot(String),
    OffDeck,
    WasteChute,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleTemporalProperties {
    pub slot: String,
    pub module_state: ModuleState,
}

/// Operating state of a module, one variant per module type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModuleState {
    Magnetic(MagneticModuleState),
    Temperature(TemperatureModuleState),
    Thermocycler(ThermocyclerModuleState),
    HeaterShaker(HeaterShakerModuleState),
    AbsorbanceReader(AbsorbanceReaderState),
}

impl ModuleState {
    /// Power-on state of a freshly loaded module.
    pub fn initial(module_type: ModuleType) -> Self {
        match module_type {
            ModuleType::Magnetic => Self::Magnetic(MagneticModuleState::default()),
            ModuleType::Temperature => Self::Temperature(TemperatureModuleState::default()),
            ModuleType::Thermocycler => Self::Thermocycler(ThermocyclerModuleState::default()),
            ModuleType::HeaterShaker => Self::HeaterShaker(HeaterShakerModuleState::default()),
            ModuleType::AbsorbanceReader => Self::AbsorbanceReader(AbsorbanceReaderState::default()),
        }
    }

    pub fn module_type(&self) -> ModuleType {
        match self {
            Self::Magnetic(_) => ModuleType::Magnetic,
            Self::Temperature(_) => ModuleType::Temperature,
            Self::Thermocycler(_) => ModuleType::Thermocycler,
            Self::HeaterShaker(_) => ModuleType::HeaterShaker,
            Self::AbsorbanceReader(_) => ModuleType::AbsorbanceReader,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagneticModuleState {
    pub engaged: bool,
    pub engage_height: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemperatureStatus {
    #[default]
    Deactivated,
    Approaching,
    AtTarget,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureModuleState {
    pub status: TemperatureStatus,
    pub target_temperature: Option<f64>,
}

/// `lid_open` is `None` until the lid has been commanded; unknown counts as closed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermocyclerModuleState {
    pub block_target_temp: Option<f64>,
    pub lid_target_temp: Option<f64>,
    pub lid_open: Option<bool>,
}

/// `latch_open` is `None` until the latch has been commanded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaterShakerModuleState {
    pub target_temp: Option<f64>,
    /// rpm, `None` when not shaking.
    pub target_speed: Option<f64>,
    pub latch_open: Option<bool>,
}

impl HeaterShakerModuleState {
    pub fn is_shaking(&self) -> bool {
        self.target_speed.is_some()
    }

    pub fn is_latch_closed(&self) -> bool {
        self.latch_open == Some(false)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsorbanceReaderState {
    pub lid_open: Option<bool>,
    pub initialization: Option<AbsorbanceReaderInitialization>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasureMode {
    Single,
    Multi,
}

/// Settings the reader was last initialized with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsorbanceReaderInitialization {
    pub measure_mode: MeasureMode,
    /// nm.
    pub sample_wavelengths: Vec<u32>,
    #[serde(default)]
    pub reference_wavelength: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedTip {
    /// Tip capacity in µL.
    pub volume: f64,
    /// Tip length in mm.
    pub length: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipState {
    /// Whether each pipette currently carries a tip.
    pub pipettes: BTreeMap<String, bool>,
    /// `true` where a tip is still sitting in the rack.
    pub tipracks: BTreeMap<String, BTreeMap<String, bool>>,
    /// Capacity and length of the tip each pipette carries.
    #[serde(default)]
    pub loaded: BTreeMap<String, LoadedTip>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidState {
    /// Contents of each tip, keyed by pipette id then tip index.
    pub pipettes: BTreeMap<String, BTreeMap<usize, LocationLiquidState>>,
    /// Contents of each well, keyed by labware id then well name.
    pub labware: BTreeMap<String, BTreeMap<String, LocationLiquidState>>,
}

/// Full simulated snapshot of the deck.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotState {
    pub pipettes: Arc<BTreeMap<String, PipetteTemporalProperties>>,
    pub labware: Arc<BTreeMap<String, LabwareTemporalProperties>>,
    pub modules: Arc<BTreeMap<String, ModuleTemporalProperties>>,
    pub tip_state: Arc<TipState>,
    pub liquid_state: Arc<LiquidState>,
}

impl RobotState {
    pub fn builder() -> RobotStateBuilder {
        RobotStateBuilder::default()
    }

    pub fn has_tip(&self, pipette_id: &str) -> bool {
        self.tip_state.pipettes.get(pipette_id).copied().unwrap_or(false)
    }

    pub fn loaded_tip(&self, pipette_id: &str) -> Option<&LoadedTip> {
        self.tip_state.loaded.get(pipette_id)
    }

    pub fn nozzles(&self, pipette_id: &str) -> NozzleConfiguration {
        self.pipettes
            .get(pipette_id)
            .map(|p| p.nozzles)
            .unwrap_or_default()
    }

    pub fn labware_location(&self, labware_id: &str) -> Option<&LabwareLocation> {
        self.labware.get(labware_id).map(|l| &l.location)
    }

    pub fn module_state(&self, module_id: &str) -> Option<&ModuleState> {
        self.modules.get(module_id).map(|m| &m.module_state)
    }

    pub fn module_slot(&self, module_id: &str) -> Option<&str> {
        self.modules.get(module_id).map(|m| m.slot.as_str())
    }

    pub fn well_liquid(&self, labware_id: &str, well: &str) -> Option<&LocationLiquidState> {
        self.liquid_state.labware.get(labware_id)?.get(well)
    }

    /// Volume held by the first tip of a pipette.
    pub fn pipette_volume(&self, pipette_id: &str) -> f64 {
        self.liquid_state
            .pipettes
            .get(pipette_id)
            .and_then(|tips| tips.get(&0))
            .map(total_volume)
            .unwrap_or(0.0)
    }

    /// Labware resting directly on `location`, if any.
    pub fn occupant_of(&self, location: &LabwareLocation) -> Option<&str> {
        self.labware
            .iter()
            .find(|(_, l)| &l.location == location)
            .map(|(id, _)| id.as_str())
    }

    /// Module sitting in a deck slot, if any.
    pub fn module_in_slot(&self, slot: &str) -> Option<&str> {
        self.modules
            .iter()
            .find(|(_, m)| m.slot == slot)
            .map(|(id, _)| id.as_str())
    }

    /// Follows the parent chain of a labware down to the deck.
    ///
    /// Returns `None` for unknown labware, dangling parents, or a cycle in the
    /// location graph.
    pub fn labware_placement(&self, labware_id: &str) -> Option<DeckPlacement> {
        let mut visited = BTreeSet::new();
        let mut current = labware_id;
        loop {
            if !visited.insert(current) {
                tracing::warn!(labware = labware_id, "cycle in labware location graph");
                return None;
            }
            match self.labware_location(current)? {
                LabwareLocation::Slot(slot) => return Some(DeckPlacement::Slot(slot.clone())),
                LabwareLocation::Module(module_id) => {
                    return self
                        .module_slot(module_id)
                        .map(|slot| DeckPlacement::Slot(slot.to_string()));
                }
                LabwareLocation::Labware(parent) => current = parent,
                LabwareLocation::OffDeck => return Some(DeckPlacement::OffDeck),
                LabwareLocation::WasteChute => return Some(DeckPlacement::WasteChute),
            }
        }
    }

    /// Deck slot a labware ultimately occupies, if it is on the deck.
    pub fn labware_slot(&self, labware_id: &str) -> Option<String> {
        match self.labware_placement(labware_id)? {
            DeckPlacement::Slot(slot) => Some(slot),
            DeckPlacement::OffDeck | DeckPlacement::WasteChute => None,
        }
    }

    /// Module a labware sits in, looking through any adapters in between.
    pub fn module_under_labware(&self, labware_id: &str) -> Option<&str> {
        let mut visited = BTreeSet::new();
        let mut current = labware_id;
        while visited.insert(current) {
            match self.labware_location(current)? {
                LabwareLocation::Module(module_id) => return Some(module_id.as_str()),
                LabwareLocation::Labware(parent) => current = parent,
                _ => return None,
            }
        }
        None
    }

    /// True when `ancestor` appears in the parent chain of `labware_id`
    /// (or is the labware itself).
    pub fn is_in_stack_of(&self, labware_id: &str, ancestor: &str) -> bool {
        let mut visited = BTreeSet::new();
        let mut current = labware_id;
        while visited.insert(current) {
            if current == ancestor {
                return true;
            }
            match self.labware_location(current) {
                Some(LabwareLocation::Labware(parent)) => current = parent,
                _ => return false,
            }
        }
        false
    }
}

/// Assembles the initial deck setup.
///
/// Tip racks start full, pipettes start without tips and modules start in
/// their power-on state.
#[derive(Clone, Debug, Default)]
pub struct RobotStateBuilder {
    pipettes: BTreeMap<String, PipetteTemporalProperties>,
    labware: BTreeMap<String, LabwareTemporalProperties>,
    modules: BTreeMap<String, String>,
    liquids: Vec<(String, String, String, f64)>,
    tips: BTreeMap<String, bool>,
}

impl RobotStateBuilder {
    pub fn pipette(mut self, id: impl Into<String>, mount: Mount) -> Self {
        self.pipettes.insert(
            id.into(),
            PipetteTemporalProperties {
                mount,
                nozzles: NozzleConfiguration::All,
            },
        );
        self
    }

    pub fn labware(mut self, id: impl Into<String>, location: LabwareLocation) -> Self {
        self.labware
            .insert(id.into(), LabwareTemporalProperties { location });
        self
    }

    pub fn module(mut self, id: impl Into<String>, slot: impl Into<String>) -> Self {
        self.modules.insert(id.into(), slot.into());
        self
    }

    /// Seeds a well with liquid.
    pub fn liquid(
        mut self,
        labware_id: impl Into<String>,
        well: impl Into<String>,
        liquid_id: impl Into<String>,
        volume: f64,
    ) -> Self {
        self.liquids
            .push((labware_id.into(), well.into(), liquid_id.into(), volume));
        self
    }

    /// Starts the pipette with a tip already attached.
    pub fn tip_attached(mut self, pipette_id: impl Into<String>) -> Self {
        self.tips.insert(pipette_id.into(), true);
        self
    }

    pub fn build(self, ctx: &InvariantContext) -> RobotState {
        let mut tip_state = TipState::default();
        for id in ctx.pipette_entities.keys() {
            let has_tip = self.tips.get(id).copied().unwrap_or(false);
            tip_state.pipettes.insert(id.clone(), has_tip);
            if has_tip && let Some(pipette) = ctx.pipette(id) {
                let rack = ctx
                    .labware_entities
                    .values()
                    .find(|l| pipette.tiprack_def_uris.contains(&l.def_uri));
                let loaded = LoadedTip {
                    volume: rack
                        .and_then(|l| l.def.parameters.tip_volume)
                        .unwrap_or(pipette.spec.max_volume),
                    length: rack.and_then(|l| l.def.parameters.tip_length).unwrap_or(0.0),
                };
                tip_state.loaded.insert(id.clone(), loaded);
            }
        }
        for (id, labware) in &ctx.labware_entities {
            if labware.def.is_tiprack() {
                let wells = labware
                    .def
                    .ordered_wells()
                    .map(|w| (w.to_string(), true))
                    .collect();
                tip_state.tipracks.insert(id.clone(), wells);
            }
        }

        let modules = self
            .modules
            .into_iter()
            .filter_map(|(id, slot)| {
                let module = ctx.module(&id)?;
                Some((
                    id,
                    ModuleTemporalProperties {
                        slot,
                        module_state: ModuleState::initial(module.module_type()),
                    },
                ))
            })
            .collect();

        let mut liquid_state = LiquidState::default();
        for (labware_id, well, liquid_id, volume) in self.liquids {
            let entry = liquid_state
                .labware
                .entry(labware_id)
                .or_default()
                .entry(well)
                .or_default()
                .entry(liquid_id)
                .or_default();
            entry.volume += volume;
        }

        RobotState {
            pipettes: Arc::new(self.pipettes),
            labware: Arc::new(self.labware),
            modules: Arc::new(modules),
            tip_state: Arc::new(tip_state),
            liquid_state: Arc::new(liquid_state),
        }
    }
}

/// Serializable description of the initial deck, used by protocol files.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSetup {
    #[serde(default)]
    pub pipettes: BTreeMap<String, Mount>,
    #[serde(default)]
    pub labware: BTreeMap<String, LabwareLocation>,
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
    #[serde(default)]
    pub liquids: Vec<InitialLiquid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialLiquid {
    pub labware_id: String,
    pub well: String,
    pub liquid_id: String,
    pub volume: f64,
}

impl DeckSetup {
    pub fn into_robot_state(self, ctx: &InvariantContext) -> RobotState {
        let mut builder = RobotState::builder();
        for (id, mount) in self.pipettes {
            builder = builder.pipette(id, mount);
        }
        for (id, location) in self.labware {
            builder = builder.labware(id, location);
        }
        for (id, slot) in self.modules {
            builder = builder.module(id, slot);
        }
        for l in self.liquids {
            builder = builder.liquid(l.labware_id, l.well, l.liquid_id, l.volume);
        }
        builder.build(ctx)
    }
}
