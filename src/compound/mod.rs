//! Compound creators: plans built by currying atomic creators and folding
//! them with the reducer.

pub mod absorbance_reader;
pub mod consolidate;
pub mod distribute;
pub mod heater_shaker;
pub mod mix;
pub mod modules;
pub mod replace_tip;
pub mod thermocycler;
pub mod transfer;
pub mod trash;
pub mod utils;

pub use absorbance_reader::*;
pub use consolidate::*;
pub use distribute::*;
pub use heater_shaker::*;
pub use mix::*;
pub use modules::*;
pub use replace_tip::*;
pub use thermocycler::*;
pub use transfer::*;
pub use trash::*;
pub use utils::{
    BlowoutLocation, DEFAULT_OFFSET_FROM_BOTTOM, DelaySettings, FlowRates, LiquidHandlingArgs, MixSettings,
    TipPolicy, TouchTipSettings, split_liquid,
};
