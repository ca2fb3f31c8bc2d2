//! Single-purpose module and pause steps.

use crate::atomic;
use crate::command::{EngageParams, ModuleParams, TemperatureParams, WaitForDurationParams, WaitForResumeParams};
use crate::creator::{CommandCreatorResult, curry, reduce_command_creators};
use crate::entities::InvariantContext;
use crate::robot_state::RobotState;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnetArgs {
    pub module_id: String,
    /// Engage height in mm; `None` disengages.
    #[serde(default)]
    pub engage_height: Option<f64>,
}

/// Engages to `engage_height`, or disengages when it is unset.
pub fn magnet(args: &MagnetArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    match args.engage_height {
        Some(height) => atomic::engage_magnet(
            &EngageParams {
                module_id: args.module_id.clone(),
                height,
            },
            ctx,
            state,
        ),
        None => atomic::disengage_magnet(
            &ModuleParams {
                module_id: args.module_id.clone(),
            },
            ctx,
            state,
        ),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureArgs {
    pub module_id: String,
    /// `None` deactivates the module.
    #[serde(default)]
    pub target_temperature: Option<f64>,
}

/// Sets the module target, or deactivates it when no target is given.
pub fn temperature(args: &TemperatureArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    match args.target_temperature {
        Some(celsius) => atomic::set_temperature(
            &TemperatureParams {
                module_id: args.module_id.clone(),
                celsius,
            },
            ctx,
            state,
        ),
        None => atomic::deactivate_temperature(
            &ModuleParams {
                module_id: args.module_id.clone(),
            },
            ctx,
            state,
        ),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pauseAction", rename_all = "camelCase")]
pub enum PauseArgs {
    Delay {
        seconds: f64,
        #[serde(default)]
        message: Option<String>,
    },
    UntilResume {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    UntilTemperature { module_id: String, celsius: f64 },
}

/// Delay, wait for the operator, or wait for a module temperature.
pub fn pause(args: &PauseArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let creator = match args {
        PauseArgs::Delay { seconds, message } => curry(
            atomic::wait_for_duration,
            WaitForDurationParams {
                seconds: *seconds,
                message: message.clone(),
            },
        ),
        PauseArgs::UntilResume { message } => curry(
            atomic::wait_for_resume,
            WaitForResumeParams {
                message: message.clone(),
            },
        ),
        PauseArgs::UntilTemperature { module_id, celsius } => curry(
            atomic::await_temperature,
            TemperatureParams {
                module_id: module_id.clone(),
                celsius: *celsius,
            },
        ),
    };
    reduce_command_creators(vec![creator], ctx, state)
}
