//! Low-level device commands emitted by command creators.
//!
//! Creators emit bare [`Command`]s; keys are attached once, by the timeline,
//! through an injected [`KeyGenerator`]. That keeps every creator a pure
//! function of its inputs.

use crate::robot_state::{LabwareLocation, MeasureMode, NozzleConfiguration};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WellOrigin {
    Top,
    #[default]
    Bottom,
    Center,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WellOffset {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Position inside a well, relative to its top, bottom or center.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellLocation {
    pub origin: WellOrigin,
    pub offset: WellOffset,
}

impl WellLocation {
    pub fn bottom(z: f64) -> Self {
        Self {
            origin: WellOrigin::Bottom,
            offset: WellOffset { z, ..Default::default() },
        }
    }

    pub fn top(z: f64) -> Self {
        Self {
            origin: WellOrigin::Top,
            offset: WellOffset { z, ..Default::default() },
        }
    }

    pub fn with_xy(mut self, x: f64, y: f64) -> Self {
        self.offset.x = x;
        self.offset.y = y;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipettingParams {
    pub pipette_id: String,
    pub volume: f64,
    pub labware_id: String,
    pub well_name: String,
    pub well_location: WellLocation,
    pub flow_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlowoutParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
    pub well_location: WellLocation,
    pub flow_rate: f64,
}

/// Moves that target a well without moving liquid (touch tip, move to well).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellTargetParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
    pub well_location: WellLocation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InPlaceVolumeParams {
    pub pipette_id: String,
    pub volume: f64,
    pub flow_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InPlaceFlowParams {
    pub pipette_id: String,
    pub flow_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipetteParams {
    pub pipette_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressableAreaParams {
    pub pipette_id: String,
    pub addressable_area_name: String,
    pub offset: WellOffset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_drop_location: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickUpTipParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureForVolumeParams {
    pub pipette_id: String,
    pub volume: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NozzleLayoutParams {
    pub style: NozzleConfiguration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_nozzle: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureNozzleLayoutParams {
    pub pipette_id: String,
    pub configuration_params: NozzleLayoutParams,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabwareMovementStrategy {
    UsingGripper,
    ManualMoveWithPause,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLabwareParams {
    pub labware_id: String,
    pub new_location: LabwareLocation,
    pub strategy: LabwareMovementStrategy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleParams {
    pub module_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureParams {
    pub module_id: String,
    pub celsius: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngageParams {
    pub module_id: String,
    /// mm above the module's home position.
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShakeSpeedParams {
    pub module_id: String,
    pub rpm: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTemperatureParams {
    pub module_id: String,
    pub celsius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_max_volume_ul: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStep {
    pub celsius: f64,
    pub hold_seconds: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProfileParams {
    pub module_id: String,
    pub profile: Vec<ProfileStep>,
    pub block_max_volume_ul: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsorbanceInitializeParams {
    pub module_id: String,
    pub measure_mode: MeasureMode,
    pub sample_wavelengths: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_wavelength: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsorbanceReadParams {
    pub module_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentParams {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaitForDurationParams {
    pub seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaitForResumeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One device command. Serializes as `{"commandType": ..., "params": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "commandType", content = "params")]
pub enum Command {
    // --- Pipetting ---
    #[serde(rename = "aspirate")]
    Aspirate(PipettingParams),
    #[serde(rename = "dispense")]
    Dispense(PipettingParams),
    #[serde(rename = "blowout")]
    Blowout(BlowoutParams),
    #[serde(rename = "touchTip")]
    TouchTip(WellTargetParams),
    #[serde(rename = "moveToWell")]
    MoveToWell(WellTargetParams),
    #[serde(rename = "airGapInPlace")]
    AirGapInPlace(InPlaceVolumeParams),
    #[serde(rename = "blowOutInPlace")]
    BlowOutInPlace(InPlaceFlowParams),
    #[serde(rename = "moveToAddressableArea")]
    MoveToAddressableArea(AddressableAreaParams),

    // --- Tips ---
    #[serde(rename = "pickUpTip")]
    PickUpTip(PickUpTipParams),
    #[serde(rename = "dropTipInPlace")]
    DropTipInPlace(PipetteParams),
    #[serde(rename = "moveToAddressableAreaForDropTip")]
    MoveToAddressableAreaForDropTip(AddressableAreaParams),
    #[serde(rename = "configureForVolume")]
    ConfigureForVolume(ConfigureForVolumeParams),
    #[serde(rename = "configureNozzleLayout")]
    ConfigureNozzleLayout(ConfigureNozzleLayoutParams),

    // --- Labware ---
    #[serde(rename = "moveLabware")]
    MoveLabware(MoveLabwareParams),

    // --- Magnetic module ---
    #[serde(rename = "magneticModule/engage")]
    EngageMagnet(EngageParams),
    #[serde(rename = "magneticModule/disengage")]
    DisengageMagnet(ModuleParams),

    // --- Temperature module ---
    #[serde(rename = "temperatureModule/setTargetTemperature")]
    TemperatureSetTarget(TemperatureParams),
    #[serde(rename = "temperatureModule/waitForTemperature")]
    TemperatureWait(TemperatureParams),
    #[serde(rename = "temperatureModule/deactivate")]
    TemperatureDeactivate(ModuleParams),

    // --- Heater-shaker ---
    #[serde(rename = "heaterShaker/setTargetTemperature")]
    HeaterShakerSetTargetTemperature(TemperatureParams),
    #[serde(rename = "heaterShaker/waitForTemperature")]
    HeaterShakerWaitForTemperature(ModuleParams),
    #[serde(rename = "heaterShaker/deactivateHeater")]
    HeaterShakerDeactivateHeater(ModuleParams),
    #[serde(rename = "heaterShaker/setAndWaitForShakeSpeed")]
    HeaterShakerSetShakeSpeed(ShakeSpeedParams),
    #[serde(rename = "heaterShaker/deactivateShaker")]
    HeaterShakerDeactivateShaker(ModuleParams),
    #[serde(rename = "heaterShaker/openLabwareLatch")]
    HeaterShakerOpenLatch(ModuleParams),
    #[serde(rename = "heaterShaker/closeLabwareLatch")]
    HeaterShakerCloseLatch(ModuleParams),

    // --- Thermocycler ---
    #[serde(rename = "thermocycler/setTargetBlockTemperature")]
    ThermocyclerSetBlockTemperature(BlockTemperatureParams),
    #[serde(rename = "thermocycler/waitForBlockTemperature")]
    ThermocyclerWaitForBlockTemperature(ModuleParams),
    #[serde(rename = "thermocycler/setTargetLidTemperature")]
    ThermocyclerSetLidTemperature(TemperatureParams),
    #[serde(rename = "thermocycler/waitForLidTemperature")]
    ThermocyclerWaitForLidTemperature(ModuleParams),
    #[serde(rename = "thermocycler/deactivateBlock")]
    ThermocyclerDeactivateBlock(ModuleParams),
    #[serde(rename = "thermocycler/deactivateLid")]
    ThermocyclerDeactivateLid(ModuleParams),
    #[serde(rename = "thermocycler/openLid")]
    ThermocyclerOpenLid(ModuleParams),
    #[serde(rename = "thermocycler/closeLid")]
    ThermocyclerCloseLid(ModuleParams),
    #[serde(rename = "thermocycler/runProfile")]
    ThermocyclerRunProfile(RunProfileParams),

    // --- Absorbance reader ---
    #[serde(rename = "absorbanceReader/openLid")]
    AbsorbanceReaderOpenLid(ModuleParams),
    #[serde(rename = "absorbanceReader/closeLid")]
    AbsorbanceReaderCloseLid(ModuleParams),
    #[serde(rename = "absorbanceReader/initialize")]
    AbsorbanceReaderInitialize(AbsorbanceInitializeParams),
    #[serde(rename = "absorbanceReader/read")]
    AbsorbanceReaderRead(AbsorbanceReadParams),

    // --- Flow ---
    #[serde(rename = "comment")]
    Comment(CommentParams),
    #[serde(rename = "waitForDuration")]
    WaitForDuration(WaitForDurationParams),
    #[serde(rename = "waitForResume")]
    WaitForResume(WaitForResumeParams),
}

impl Command {
    /// The `commandType` tag this command serializes with.
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::Aspirate(_) => "aspirate",
            Self::Dispense(_) => "dispense",
            Self::Blowout(_) => "blowout",
            Self::TouchTip(_) => "touchTip",
            Self::MoveToWell(_) => "moveToWell",
            Self::AirGapInPlace(_) => "airGapInPlace",
            Self::BlowOutInPlace(_) => "blowOutInPlace",
            Self::MoveToAddressableArea(_) => "moveToAddressableArea",
            Self::PickUpTip(_) => "pickUpTip",
            Self::DropTipInPlace(_) => "dropTipInPlace",
            Self::MoveToAddressableAreaForDropTip(_) => "moveToAddressableAreaForDropTip",
            Self::ConfigureForVolume(_) => "configureForVolume",
            Self::ConfigureNozzleLayout(_) => "configureNozzleLayout",
            Self::MoveLabware(_) => "moveLabware",
            Self::EngageMagnet(_) => "magneticModule/engage",
            Self::DisengageMagnet(_) => "magneticModule/disengage",
            Self::TemperatureSetTarget(_) => "temperatureModule/setTargetTemperature",
            Self::TemperatureWait(_) => "temperatureModule/waitForTemperature",
            Self::TemperatureDeactivate(_) => "temperatureModule/deactivate",
            Self::HeaterShakerSetTargetTemperature(_) => "heaterShaker/setTargetTemperature",
            Self::HeaterShakerWaitForTemperature(_) => "heaterShaker/waitForTemperature",
            Self::HeaterShakerDeactivateHeater(_) => "heaterShaker/deactivateHeater",
            Self::HeaterShakerSetShakeSpeed(_) => "heaterShaker/setAndWaitForShakeSpeed",
            Self::HeaterShakerDeactivateShaker(_) => "heaterShaker/deactivateShaker",
            Self::HeaterShakerOpenLatch(_) => "heaterShaker/openLabwareLatch",
            Self::HeaterShakerCloseLatch(_) => "heaterShaker/closeLabwareLatch",
            Self::ThermocyclerSetBlockTemperature(_) => "thermocycler/setTargetBlockTemperature",
            Self::ThermocyclerWaitForBlockTemperature(_) => "thermocycler/waitForBlockTemperature",
            Self::ThermocyclerSetLidTemperature(_) => "thermocycler/setTargetLidTemperature",
            Self::ThermocyclerWaitForLidTemperature(_) => "thermocycler/waitForLidTemperature",
            Self::ThermocyclerDeactivateBlock(_) => "thermocycler/deactivateBlock",
            Self::ThermocyclerDeactivateLid(_) => "thermocycler/deactivateLid",
            Self::ThermocyclerOpenLid(_) => "thermocycler/openLid",
            Self::ThermocyclerCloseLid(_) => "thermocycler/closeLid",
            Self::ThermocyclerRunProfile(_) => "thermocycler/runProfile",
            Self::AbsorbanceReaderOpenLid(_) => "absorbanceReader/openLid",
            Self::AbsorbanceReaderCloseLid(_) => "absorbanceReader/closeLid",
            Self::AbsorbanceReaderInitialize(_) => "absorbanceReader/initialize",
            Self::AbsorbanceReaderRead(_) => "absorbanceReader/read",
            Self::Comment(_) => "comment",
            Self::WaitForDuration(_) => "waitForDuration",
            Self::WaitForResume(_) => "waitForResume",
        }
    }
}

/// A command with the key it was assigned in the timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyedCommand {
    pub key: String,
    #[serde(flatten)]
    pub command: Command,
}

/// Source of opaque command keys.
pub trait KeyGenerator {
    fn next_key(&mut self) -> String;
}

/// Random v4 UUID keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidKeys;

impl KeyGenerator for UuidKeys {
    fn next_key(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix-0`, `prefix-1`, ... keys.
#[derive(Clone, Debug)]
pub struct SequentialKeys {
    prefix: String,
    next: u64,
}

impl SequentialKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl Default for SequentialKeys {
    fn default() -> Self {
        Self::new("cmd")
    }
}

impl KeyGenerator for SequentialKeys {
    fn next_key(&mut self) -> String {
        let key = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        key
    }
}
