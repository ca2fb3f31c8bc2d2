//! Static entity definitions referenced by id during a compile.
//!
//! Everything in here is read-only once an [`InvariantContext`] has been built.
//! Volumes and positions that change over time live in [`crate::RobotState`].

use crate::deck::RobotType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Pipette models that must be told which volume range to use before pipetting.
pub const LOW_VOLUME_PIPETTES: [&str; 2] = ["p50_single_flex", "p50_multi_flex"];

/// Immutable registry of every entity a protocol refers to.
///
/// Entity maps keep their declared order, which is the order tip racks are
/// scanned in when looking for the next tip.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvariantContext {
    /// Which robot the protocol targets. Drives deck topology and some hazard rules.
    #[serde(default)]
    pub robot_type: RobotType,
    #[serde(default)]
    pub pipette_entities: IndexMap<String, PipetteEntity>,
    #[serde(default)]
    pub labware_entities: IndexMap<String, LabwareEntity>,
    #[serde(default)]
    pub module_entities: IndexMap<String, ModuleEntity>,
    #[serde(default)]
    pub liquid_entities: IndexMap<String, LiquidEntity>,
    #[serde(default)]
    pub additional_equipment_entities: IndexMap<String, AdditionalEquipmentEntity>,
}

impl InvariantContext {
    pub fn new(robot_type: RobotType) -> Self {
        Self {
            robot_type,
            ..Default::default()
        }
    }

    pub fn with_pipette(mut self, pipette: PipetteEntity) -> Self {
        self.pipette_entities.insert(pipette.id.clone(), pipette);
        self
    }

    pub fn with_labware(mut self, labware: LabwareEntity) -> Self {
        self.labware_entities.insert(labware.id.clone(), labware);
        self
    }

    pub fn with_module(mut self, module: ModuleEntity) -> Self {
        self.module_entities.insert(module.id.clone(), module);
        self
    }

    pub fn with_liquid(mut self, liquid: LiquidEntity) -> Self {
        self.liquid_entities.insert(liquid.id.clone(), liquid);
        self
    }

    pub fn with_equipment(mut self, equipment: AdditionalEquipmentEntity) -> Self {
        self.additional_equipment_entities
            .insert(equipment.id.clone(), equipment);
        self
    }

    pub fn pipette(&self, id: &str) -> Option<&PipetteEntity> {
        self.pipette_entities.get(id)
    }

    pub fn labware(&self, id: &str) -> Option<&LabwareEntity> {
        self.labware_entities.get(id)
    }

    pub fn module(&self, id: &str) -> Option<&ModuleEntity> {
        self.module_entities.get(id)
    }

    pub fn equipment(&self, id: &str) -> Option<&AdditionalEquipmentEntity> {
        self.additional_equipment_entities.get(id)
    }

    /// True when any gripper is attached to the robot.
    pub fn has_gripper(&self) -> bool {
        self.additional_equipment_entities
            .values()
            .any(|e| e.kind == EquipmentKind::Gripper)
    }

    /// Largest tip volume among labware loaded with the given definition URI.
    pub fn tip_volume_for_rack(&self, tiprack_def_uri: &str) -> Option<f64> {
        self.labware_entities
            .values()
            .filter(|l| l.def_uri == tiprack_def_uri)
            .find_map(|l| l.def.parameters.tip_volume)
    }

    /// Usable volume of a pipette fitted with tips from `tiprack_def_uri`.
    ///
    /// Falls back to the pipette's own maximum when the rack is unknown.
    pub fn pipette_with_tip_max_volume(&self, pipette_id: &str, tiprack_def_uri: &str) -> Option<f64> {
        let pipette = self.pipette(pipette_id)?;
        let pipette_max = pipette.spec.max_volume;
        Some(match self.tip_volume_for_rack(tiprack_def_uri) {
            Some(tip) => pipette_max.min(tip),
            None => pipette_max,
        })
    }
}

/// A pipette loaded on the robot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipetteEntity {
    pub id: String,
    /// Model name, e.g. `p300_single_gen2` or `p1000_96`.
    pub name: String,
    pub spec: PipetteSpecs,
    /// Definition URIs of the tip racks this pipette may pick up from.
    #[serde(default)]
    pub tiprack_def_uris: Vec<String>,
    /// Variable name used by the scripting emitter.
    #[serde(default)]
    pub python_name: Option<String>,
}

impl PipetteEntity {
    pub fn channels(&self) -> u8 {
        self.spec.channels
    }

    pub fn is_multi_channel(&self) -> bool {
        self.spec.channels > 1
    }

    pub fn is_96_channel(&self) -> bool {
        self.spec.channels == 96
    }

    pub fn is_low_volume(&self) -> bool {
        LOW_VOLUME_PIPETTES.contains(&self.name.as_str())
    }

    /// First-generation OT-2 multi-channel pipettes have a wide body that
    /// clips tall modules in the front and back corner slots.
    pub fn is_gen1_multi_channel(&self) -> bool {
        self.spec.channels == 8 && !self.name.contains("_gen2") && !self.name.contains("_flex")
    }
}

/// Volume and flow-rate characteristics of a pipette model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipetteSpecs {
    pub display_name: String,
    /// 1, 8 or 96.
    pub channels: u8,
    /// Maximum volume in µL.
    pub max_volume: f64,
    /// Minimum volume in µL.
    pub min_volume: f64,
    /// Default flow rates in µL/s.
    pub default_aspirate_flow_rate: f64,
    pub default_dispense_flow_rate: f64,
    pub default_blow_out_flow_rate: f64,
}

/// A piece of labware placed somewhere on (or off) the deck.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareEntity {
    pub id: String,
    /// `namespace/loadName/version`.
    pub def_uri: String,
    pub def: LabwareDefinition,
    #[serde(default)]
    pub python_name: Option<String>,
}

/// Geometry and metadata of a labware type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareDefinition {
    pub display_name: String,
    pub load_name: String,
    /// Outer footprint (x, y) and height (z) in mm.
    pub dimensions: LabwareDimensions,
    pub wells: IndexMap<String, WellDefinition>,
    /// Well names grouped by column, left column first; row A leads each column.
    pub ordering: Vec<Vec<String>>,
    #[serde(default)]
    pub parameters: LabwareParameters,
    #[serde(default)]
    pub allowed_roles: Vec<LabwareRole>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareDimensions {
    pub x_dimension: f64,
    pub y_dimension: f64,
    pub z_dimension: f64,
}

/// A single well, positioned relative to the labware's front-left-bottom corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellDefinition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub depth: f64,
    /// Capacity in µL.
    pub total_liquid_volume: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareParameters {
    #[serde(default)]
    pub is_tiprack: bool,
    #[serde(default)]
    pub tip_length: Option<f64>,
    /// Tip capacity in µL, tip racks only.
    #[serde(default)]
    pub tip_volume: Option<f64>,
}

/// What a labware may act as besides holding liquid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabwareRole {
    Labware,
    Adapter,
    Lid,
}

impl LabwareDefinition {
    pub fn is_tiprack(&self) -> bool {
        self.parameters.is_tiprack
    }

    pub fn is_adapter(&self) -> bool {
        self.allowed_roles.contains(&LabwareRole::Adapter)
    }

    pub fn is_lid(&self) -> bool {
        self.allowed_roles.contains(&LabwareRole::Lid)
    }

    pub fn well(&self, name: &str) -> Option<&WellDefinition> {
        self.wells.get(name)
    }

    /// Well names in column-major order (A1, B1, ... H1, A2, ...).
    pub fn ordered_wells(&self) -> impl Iterator<Item = &str> {
        self.ordering.iter().flatten().map(String::as_str)
    }

    /// Column and row index of a well within [`Self::ordering`].
    pub fn well_position(&self, name: &str) -> Option<(usize, usize)> {
        self.ordering.iter().enumerate().find_map(|(col, column)| {
            column
                .iter()
                .position(|w| w == name)
                .map(|row| (col, row))
        })
    }

    /// Wells touched by a block of nozzles whose back-left nozzle is at `primary_well`.
    ///
    /// `active_tips` is 1, 8 (one column of nozzles) or 96 (12 x 8 head).
    /// Denser labware is strided (every other row of a 384 plate); sparser labware
    /// has several nozzles sharing a well (reservoirs). Returns `None` when the
    /// nozzles would hang off the labware.
    pub fn wells_under_nozzles(&self, primary_well: &str, active_tips: usize) -> Option<Vec<String>> {
        if active_tips <= 1 {
            return self.wells.contains_key(primary_well).then(|| vec![primary_well.to_string()]);
        }
        let (col, row) = self.well_position(primary_well)?;
        let column_len = self.ordering.get(col)?.len();
        let (nozzle_cols, nozzle_rows) = if active_tips >= 96 { (12, 8) } else { (1, 8) };

        let cols = if nozzle_cols == 1 {
            vec![col]
        } else {
            map_nozzle_axis(nozzle_cols, self.ordering.len(), col)?
        };
        let rows = map_nozzle_axis(nozzle_rows, column_len, row)?;

        let mut wells = Vec::with_capacity(cols.len() * rows.len());
        for c in &cols {
            let column = self.ordering.get(*c)?;
            for r in &rows {
                wells.push(column.get(*r)?.clone());
            }
        }
        Some(wells)
    }
}

/// Maps `nozzles` nozzles along one axis onto `wells` wells, starting at `start`.
fn map_nozzle_axis(nozzles: usize, wells: usize, start: usize) -> Option<Vec<usize>> {
    if wells >= nozzles {
        let stride = wells / nozzles;
        let indices: Vec<usize> = (0..nozzles).map(|i| start + i * stride).collect();
        indices.last().is_some_and(|&last| last < wells).then_some(indices)
    } else if start == 0 {
        Some((0..nozzles).map(|i| i * wells / nozzles).collect())
    } else {
        None
    }
}

/// A hardware module occupying a deck slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntity {
    pub id: String,
    pub model: ModuleModel,
    #[serde(default)]
    pub python_name: Option<String>,
}

impl ModuleEntity {
    pub fn module_type(&self) -> ModuleType {
        self.model.module_type()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleType {
    #[serde(rename = "magneticModuleType")]
    Magnetic,
    #[serde(rename = "temperatureModuleType")]
    Temperature,
    #[serde(rename = "thermocyclerModuleType")]
    Thermocycler,
    #[serde(rename = "heaterShakerModuleType")]
    HeaterShaker,
    #[serde(rename = "absorbanceReaderType")]
    AbsorbanceReader,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleModel {
    MagneticModuleV1,
    MagneticModuleV2,
    TemperatureModuleV1,
    TemperatureModuleV2,
    ThermocyclerModuleV1,
    ThermocyclerModuleV2,
    HeaterShakerModuleV1,
    AbsorbanceReaderV1,
}

impl ModuleModel {
    pub fn module_type(self) -> ModuleType {
        match self {
            Self::MagneticModuleV1 | Self::MagneticModuleV2 => ModuleType::Magnetic,
            Self::TemperatureModuleV1 | Self::TemperatureModuleV2 => ModuleType::Temperature,
            Self::ThermocyclerModuleV1 | Self::ThermocyclerModuleV2 => ModuleType::Thermocycler,
            Self::HeaterShakerModuleV1 => ModuleType::HeaterShaker,
            Self::AbsorbanceReaderV1 => ModuleType::AbsorbanceReader,
        }
    }

    /// Height of the module body above the deck, in mm.
    pub fn overall_height(self) -> f64 {
        match self {
            Self::MagneticModuleV1 | Self::MagneticModuleV2 => 110.2,
            Self::TemperatureModuleV1 | Self::TemperatureModuleV2 => 84.0,
            Self::ThermocyclerModuleV1 | Self::ThermocyclerModuleV2 => 98.0,
            Self::HeaterShakerModuleV1 => 82.0,
            Self::AbsorbanceReaderV1 => 18.5,
        }
    }

    /// Gen1 magnetic and temperature modules are tall enough to hit the body of a
    /// gen1 multi-channel pipette reaching into a neighbouring column.
    pub fn has_multi_channel_collision_issue(self) -> bool {
        matches!(self, Self::MagneticModuleV1 | Self::TemperatureModuleV1)
    }
}

/// Display metadata for a liquid. Volumes are tracked in the robot state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidEntity {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_color: Option<String>,
}

/// Trash, waste chute, gripper or staging area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalEquipmentEntity {
    pub id: String,
    #[serde(rename = "name")]
    pub kind: EquipmentKind,
    /// Deck slot (or cutout) the equipment sits in. Grippers have none.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub python_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EquipmentKind {
    TrashBin,
    WasteChute,
    Gripper,
    StagingArea,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_def(cols: usize, rows: usize) -> LabwareDefinition {
        let mut wells = IndexMap::new();
        let mut ordering = Vec::new();
        for c in 0..cols {
            let mut column = Vec::new();
            for r in 0..rows {
                let name = format!("{}{}", (b'A' + r as u8) as char, c + 1);
                wells.insert(
                    name.clone(),
                    WellDefinition {
                        x: 14.38 + 9.0 * c as f64,
                        y: 74.24 - 9.0 * r as f64,
                        z: 1.0,
                        depth: 10.0,
                        total_liquid_volume: 200.0,
                    },
                );
                column.push(name);
            }
            ordering.push(column);
        }
        LabwareDefinition {
            display_name: "grid".into(),
            load_name: "grid".into(),
            dimensions: LabwareDimensions::default(),
            wells,
            ordering,
            parameters: LabwareParameters::default(),
            allowed_roles: Vec::new(),
        }
    }

    #[test]
    fn eight_nozzles_cover_a_plate_column() {
        let plate = grid_def(12, 8);
        let wells = plate.wells_under_nozzles("A3", 8).unwrap();
        assert_eq!(wells.len(), 8);
        assert_eq!(wells[0], "A3");
        assert_eq!(wells[7], "H3");
        assert!(plate.wells_under_nozzles("B3", 8).is_none());
    }

    #[test]
    fn eight_nozzles_stride_a_384_plate() {
        let plate = grid_def(24, 16);
        let wells = plate.wells_under_nozzles("B1", 8).unwrap();
        assert_eq!(wells, ["B1", "D1", "F1", "H1", "J1", "L1", "N1", "P1"]);
    }

    #[test]
    fn reservoir_wells_are_shared() {
        let reservoir = grid_def(12, 1);
        let wells = reservoir.wells_under_nozzles("A1", 8).unwrap();
        assert!(wells.iter().all(|w| w == "A1"));
        let full = reservoir.wells_under_nozzles("A1", 96).unwrap();
        assert_eq!(full.len(), 96);
        assert_eq!(full[95], "A12");
    }
}
