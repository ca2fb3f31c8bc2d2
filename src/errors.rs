//! Error and warning taxonomy.
//!
//! Command creators never fail with a Rust error. They report a closed set of
//! [`ErrorType`]s and [`WarningType`]s as plain data that serializes to
//! `{"type": ..., "message": ...}`. The crate-level [`Error`] only covers the
//! surroundings of the engine: configuration and protocol files.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad family an [`ErrorType`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorClass {
    /// An id that does not resolve.
    Reference,
    /// A physically impossible precondition.
    State,
    /// A move that would be unsafe for the hardware.
    Hazard,
    /// A volume the pipette or tip cannot handle.
    Numeric,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    // --- Reference ---
    PipetteDoesNotExist,
    LabwareDoesNotExist,
    MissingModule,
    DropTipLocationDoesNotExist,
    EquipmentDoesNotExist,

    // --- State ---
    NoTipOnPipette,
    InsufficientTips,
    LabwareOffDeck,
    LabwareDiscardedInWasteChute,
    MissingTemperatureStep,
    AbsorbanceReaderNoInitialization,
    AbsorbanceReaderNoGripper,
    GripperRequired,
    MissingAdapter,
    RemoveAdapter,
    LabwareLocationOccupied,
    InvalidLabwareLocation,
    UnsupportedModuleAction,
    MismatchedWellCount,

    // --- Hazard ---
    #[serde(rename = "PIPETTING_INTO_COLUMN_4")]
    PipettingIntoColumn4,
    ModulePipetteCollisionDanger,
    ThermocyclerLidClosed,
    AbsorbanceReaderLidClosed,
    HeaterShakerLatchOpen,
    HeaterShakerLatchClosed,
    HeaterShakerIsShaking,
    HeaterShakerNorthSouthEastWestShaking,
    HeaterShakerEastWestLatchOpen,
    HeaterShakerEastWestMultiChannel,
    HeaterShakerNorthSouthOfNonTiprackWithMultiChannel,
    PossiblePipetteCollision,

    // --- Numeric ---
    PipetteVolumeExceeded,
    TipVolumeExceeded,
    InvalidVolume,
}

impl ErrorType {
    /// The family used to group messages for display.
    pub fn class(self) -> ErrorClass {
        use ErrorType::*;
        match self {
            PipetteDoesNotExist
            | LabwareDoesNotExist
            | MissingModule
            | DropTipLocationDoesNotExist
            | EquipmentDoesNotExist => ErrorClass::Reference,
            NoTipOnPipette
            | InsufficientTips
            | LabwareOffDeck
            | LabwareDiscardedInWasteChute
            | MissingTemperatureStep
            | AbsorbanceReaderNoInitialization
            | AbsorbanceReaderNoGripper
            | GripperRequired
            | MissingAdapter
            | RemoveAdapter
            | LabwareLocationOccupied
            | InvalidLabwareLocation
            | UnsupportedModuleAction
            | MismatchedWellCount => ErrorClass::State,
            PipettingIntoColumn4
            | ModulePipetteCollisionDanger
            | ThermocyclerLidClosed
            | AbsorbanceReaderLidClosed
            | HeaterShakerLatchOpen
            | HeaterShakerLatchClosed
            | HeaterShakerIsShaking
            | HeaterShakerNorthSouthEastWestShaking
            | HeaterShakerEastWestLatchOpen
            | HeaterShakerEastWestMultiChannel
            | HeaterShakerNorthSouthOfNonTiprackWithMultiChannel
            | PossiblePipetteCollision => ErrorClass::Hazard,
            PipetteVolumeExceeded | TipVolumeExceeded | InvalidVolume => ErrorClass::Numeric,
        }
    }
}

/// A fatal validation failure reported by a command creator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct CommandCreatorError {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub message: String,
}

impl CommandCreatorError {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningType {
    AspirateMoreThanWellContents,
    AspirateFromPristineWell,
    OverMaxWellVolume,
    TiprackInWasteChuteHasTips,
    LabwareInWasteChuteHasLiquid,
    TemperatureMayNotBeReached,
}

/// A non-fatal caution that accompanies otherwise valid commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct CommandCreatorWarning {
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    pub message: String,
}

impl CommandCreatorWarning {
    pub fn new(warning_type: WarningType, message: impl Into<String>) -> Self {
        Self {
            warning_type,
            message: message.into(),
        }
    }
}

// --- Error constructors ---

pub fn pipette_does_not_exist(pipette_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::PipetteDoesNotExist,
        format!("Attempted to use pipette \"{pipette_id}\" that does not exist"),
    )
}

pub fn labware_does_not_exist(labware_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::LabwareDoesNotExist,
        format!("Attempted to interact with labware \"{labware_id}\" that does not exist"),
    )
}

pub fn missing_module(module_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::MissingModule,
        format!("Module \"{module_id}\" is not on the deck"),
    )
}

pub fn drop_tip_location_does_not_exist(location: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::DropTipLocationDoesNotExist,
        format!("Tip drop location \"{location}\" is not a trash bin or waste chute on the deck"),
    )
}

pub fn equipment_does_not_exist(equipment_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::EquipmentDoesNotExist,
        format!("Equipment \"{equipment_id}\" is not on the deck"),
    )
}

pub fn no_tip_on_pipette(pipette_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::NoTipOnPipette,
        format!("Attempted to interact with the contents of a well but pipette \"{pipette_id}\" has no tip"),
    )
}

pub fn insufficient_tips(tiprack_def_uri: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::InsufficientTips,
        format!("Not enough tips left in racks of type \"{tiprack_def_uri}\" to complete this step"),
    )
}

pub fn labware_off_deck(labware_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::LabwareOffDeck,
        format!("Labware \"{labware_id}\" is off the deck"),
    )
}

pub fn labware_discarded_in_waste_chute(labware_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::LabwareDiscardedInWasteChute,
        format!("Labware \"{labware_id}\" has already been discarded in the waste chute"),
    )
}

pub fn missing_temperature_step(module_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::MissingTemperatureStep,
        format!("Module \"{module_id}\" has no target temperature to wait for"),
    )
}

pub fn absorbance_reader_no_initialization(module_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::AbsorbanceReaderNoInitialization,
        format!("Absorbance reader \"{module_id}\" must be initialized before reading"),
    )
}

pub fn absorbance_reader_no_gripper() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::AbsorbanceReaderNoGripper,
        "Moving the absorbance reader lid requires a gripper",
    )
}

pub fn gripper_required() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::GripperRequired,
        "A gripper is required to move labware with the gripper",
    )
}

pub fn missing_adapter(tiprack_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::MissingAdapter,
        format!("A 96-channel full pickup requires tip rack \"{tiprack_id}\" to sit on an adapter"),
    )
}

pub fn remove_adapter(tiprack_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::RemoveAdapter,
        format!("A 96-channel column pickup requires tip rack \"{tiprack_id}\" to sit directly on the deck"),
    )
}

pub fn labware_location_occupied(location: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::LabwareLocationOccupied,
        format!("Location {location} is already occupied"),
    )
}

pub fn invalid_labware_location(labware_id: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::InvalidLabwareLocation,
        format!("Labware \"{labware_id}\" cannot be placed on itself or on labware stacked on it"),
    )
}

pub fn unsupported_module_action(module_id: &str, action: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::UnsupportedModuleAction,
        format!("Module \"{module_id}\" does not support {action}"),
    )
}

pub fn mismatched_well_count(sources: usize, destinations: usize) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::MismatchedWellCount,
        format!("Cannot pair {sources} source wells with {destinations} destination wells"),
    )
}

pub fn pipetting_into_column_4(slot: &str) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::PipettingIntoColumn4,
        format!("Pipettes cannot reach labware in staging slot {slot}"),
    )
}

pub fn module_pipette_collision_danger() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::ModulePipetteCollisionDanger,
        "Gen1 multi-channel pipettes cannot access labware on a gen1 module in slot 1 or 3",
    )
}

pub fn thermocycler_lid_closed() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::ThermocyclerLidClosed,
        "Attempted to interact with labware inside a thermocycler with its lid closed",
    )
}

pub fn absorbance_reader_lid_closed() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::AbsorbanceReaderLidClosed,
        "Attempted to interact with labware inside an absorbance reader with its lid closed",
    )
}

pub fn heater_shaker_latch_open() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::HeaterShakerLatchOpen,
        "The heater-shaker labware latch must be closed",
    )
}

pub fn heater_shaker_latch_closed() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::HeaterShakerLatchClosed,
        "The heater-shaker labware latch must be open to move labware onto or off it",
    )
}

pub fn heater_shaker_is_shaking() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::HeaterShakerIsShaking,
        "Cannot interact with the heater-shaker while it is shaking",
    )
}

pub fn heater_shaker_north_south_east_west_shaking() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::HeaterShakerNorthSouthEastWestShaking,
        "Cannot pipette next to a heater-shaker that is shaking",
    )
}

pub fn heater_shaker_east_west_latch_open() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::HeaterShakerEastWestLatchOpen,
        "Cannot pipette east or west of a heater-shaker whose latch is open",
    )
}

pub fn heater_shaker_east_west_multi_channel() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::HeaterShakerEastWestMultiChannel,
        "Multi-channel pipettes cannot access labware east or west of a heater-shaker",
    )
}

pub fn heater_shaker_north_south_of_non_tiprack_with_multi_channel() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::HeaterShakerNorthSouthOfNonTiprackWithMultiChannel,
        "Multi-channel pipettes can only access tip racks north or south of a heater-shaker",
    )
}

pub fn possible_pipette_collision() -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::PossiblePipetteCollision,
        "The 96-channel head in column mode would collide with taller labware in a neighbouring slot",
    )
}

pub fn pipette_volume_exceeded(action: &str, volume: f64, max_volume: f64) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::PipetteVolumeExceeded,
        format!("Attempted to {action} {volume} µL with a maximum volume of {max_volume} µL"),
    )
}

pub fn tip_volume_exceeded(action: &str, volume: f64, max_volume: f64) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::TipVolumeExceeded,
        format!("Attempted to {action} {volume} µL into a tip that holds {max_volume} µL"),
    )
}

pub fn invalid_volume(action: &str, volume: f64) -> CommandCreatorError {
    CommandCreatorError::new(
        ErrorType::InvalidVolume,
        format!("Cannot {action} {volume} µL: volumes must be finite and positive"),
    )
}

// --- Warning constructors ---

pub fn aspirate_more_than_well_contents() -> CommandCreatorWarning {
    CommandCreatorWarning::new(
        WarningType::AspirateMoreThanWellContents,
        "Not enough liquid in the well to aspirate the requested volume",
    )
}

pub fn aspirate_from_pristine_well() -> CommandCreatorWarning {
    CommandCreatorWarning::new(
        WarningType::AspirateFromPristineWell,
        "Aspirating from a well that has never held liquid",
    )
}

pub fn over_max_well_volume() -> CommandCreatorWarning {
    CommandCreatorWarning::new(
        WarningType::OverMaxWellVolume,
        "Dispense volume will overflow the well",
    )
}

pub fn tiprack_in_waste_chute_has_tips() -> CommandCreatorWarning {
    CommandCreatorWarning::new(
        WarningType::TiprackInWasteChuteHasTips,
        "Disposing of a tip rack that still has unused tips",
    )
}

pub fn labware_in_waste_chute_has_liquid() -> CommandCreatorWarning {
    CommandCreatorWarning::new(
        WarningType::LabwareInWasteChuteHasLiquid,
        "Disposing of labware that still contains liquid",
    )
}

pub fn temperature_may_not_be_reached(target: f64, requested: f64) -> CommandCreatorWarning {
    CommandCreatorWarning::new(
        WarningType::TemperatureMayNotBeReached,
        format!("Waiting for {requested} °C while the module is set to {target} °C"),
    )
}

/// Failures outside the engine itself.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration load error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    InvalidConfig(String),

    #[error("Protocol parse error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, Error>;
