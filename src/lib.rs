//! # liquid-robot
//!
//! A command compiler and state simulator for liquid-handling robot protocols.
//!
//! High-level protocol steps (transfer, mix, heat, shake, move labware, ...) are
//! compiled into a flat, ordered list of device commands. Every step is checked
//! against a simulated [`RobotState`] (tips, liquid volumes, module status,
//! labware positions) that is threaded through the whole protocol, so physical
//! hazards and impossible preconditions surface as structured errors before
//! anything runs on hardware.
//!
//! The building blocks are command creators: pure functions of
//! `(args, InvariantContext, RobotState)` that either emit commands or report
//! errors. [`atomic`] holds one creator per primitive, [`compound`] plans
//! multi-command operations out of them and [`TimelineCompiler`] folds a whole
//! protocol into per-step frames.

pub mod advance;
pub mod atomic;
pub mod command;
pub mod compound;
pub mod config;
pub mod creator;
pub mod deck;
pub mod entities;
pub mod errors;
pub mod hazards;
pub mod python;
pub mod robot_state;
pub mod steps;
pub mod timeline;

pub use command::{Command, KeyGenerator, KeyedCommand, SequentialKeys, UuidKeys};
pub use config::{CompilerConfig, KeyStrategy};
pub use creator::{
    CommandCreator, CommandCreatorErrors, CommandCreatorResult, CommandsAndWarnings, CurriedCommandCreator, curry,
    reduce_command_creators,
};
pub use deck::RobotType;
pub use entities::InvariantContext;
pub use errors::{
    CommandCreatorError, CommandCreatorWarning, Error, ErrorClass, ErrorType, Result, WarningType,
};
pub use robot_state::{DeckSetup, RobotState};
pub use steps::{MoveLiquidArgs, StepArgs};
pub use timeline::{ProtocolFile, Timeline, TimelineCompiler, TimelineFrame};
