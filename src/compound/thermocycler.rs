//! Thermocycler state and profile steps.
//!
//! A state step only emits what differs from the module's current state.

use crate::atomic;
use crate::command::{BlockTemperatureParams, ModuleParams, ProfileStep, RunProfileParams, TemperatureParams};
use crate::creator::{CommandCreatorResult, CurriedCommandCreator, curry, fail, reduce_command_creators};
use crate::entities::InvariantContext;
use crate::errors;
use crate::robot_state::{ModuleState, RobotState, ThermocyclerModuleState};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermocyclerStateArgs {
    pub module_id: String,
    /// `None` deactivates the block.
    #[serde(default)]
    pub block_target_temp: Option<f64>,
    #[serde(default)]
    pub block_max_volume: Option<f64>,
    /// `None` deactivates the lid heater.
    #[serde(default)]
    pub lid_target_temp: Option<f64>,
    pub lid_open: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermocyclerProfileArgs {
    pub module_id: String,
    pub profile: Vec<ProfileStep>,
    pub profile_target_lid_temp: f64,
    pub block_max_volume: f64,
    /// State the module is left in once the profile finishes.
    pub hold: ThermocyclerHold,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermocyclerHold {
    #[serde(default)]
    pub block_target_temp: Option<f64>,
    #[serde(default)]
    pub lid_target_temp: Option<f64>,
    pub lid_open: bool,
}

fn thermocycler_state<'s>(
    module_id: &str,
    ctx: &InvariantContext,
    state: &'s RobotState,
) -> Option<&'s ThermocyclerModuleState> {
    ctx.module(module_id)?;
    match state.module_state(module_id)? {
        ModuleState::Thermocycler(tc) => Some(tc),
        _ => None,
    }
}

fn same(current: Option<f64>, wanted: Option<f64>) -> bool {
    match (current, wanted) {
        (Some(c), Some(w)) => (c - w).abs() <= f64::EPSILON,
        (None, None) => true,
        _ => false,
    }
}

fn state_creators(args: &ThermocyclerStateArgs, current: &ThermocyclerModuleState) -> Vec<CurriedCommandCreator> {
    let module = || ModuleParams {
        module_id: args.module_id.clone(),
    };
    let mut creators = Vec::new();

    // 1. Close the lid before any heating
    if !args.lid_open && current.lid_open != Some(false) {
        creators.push(curry(atomic::thermocycler_close_lid, module()));
    }
    // 2. Block
    if !same(current.block_target_temp, args.block_target_temp) {
        match args.block_target_temp {
            Some(celsius) => {
                creators.push(curry(
                    atomic::thermocycler_set_target_block_temperature,
                    BlockTemperatureParams {
                        module_id: args.module_id.clone(),
                        celsius,
                        block_max_volume_ul: args.block_max_volume,
                    },
                ));
                creators.push(curry(atomic::thermocycler_wait_for_block_temperature, module()));
            }
            None => creators.push(curry(atomic::thermocycler_deactivate_block, module())),
        }
    }
    // 3. Lid
    if !same(current.lid_target_temp, args.lid_target_temp) {
        match args.lid_target_temp {
            Some(celsius) => {
                creators.push(curry(
                    atomic::thermocycler_set_target_lid_temperature,
                    TemperatureParams {
                        module_id: args.module_id.clone(),
                        celsius,
                    },
                ));
                creators.push(curry(atomic::thermocycler_wait_for_lid_temperature, module()));
            }
            None => creators.push(curry(atomic::thermocycler_deactivate_lid, module())),
        }
    }
    // 4. Open last
    if args.lid_open && current.lid_open != Some(true) {
        creators.push(curry(atomic::thermocycler_open_lid, module()));
    }
    creators
}

/// Drives lid, block and lid heater to the requested state.
pub fn thermocycler_state_step(
    args: &ThermocyclerStateArgs,
    ctx: &InvariantContext,
    state: &RobotState,
) -> CommandCreatorResult {
    let Some(current) = thermocycler_state(&args.module_id, ctx, state) else {
        return fail(errors::missing_module(&args.module_id));
    };
    let creators = state_creators(args, current);
    tracing::debug!(module = %args.module_id, commands = creators.len(), "planned thermocycler state");
    reduce_command_creators(creators, ctx, state)
}

/// Closes the lid, heats it, runs the profile, then settles into the hold state.
pub fn thermocycler_profile_step(
    args: &ThermocyclerProfileArgs,
    ctx: &InvariantContext,
    state: &RobotState,
) -> CommandCreatorResult {
    let Some(current) = thermocycler_state(&args.module_id, ctx, state) else {
        return fail(errors::missing_module(&args.module_id));
    };
    let module = || ModuleParams {
        module_id: args.module_id.clone(),
    };

    let mut creators = Vec::new();
    if current.lid_open != Some(false) {
        creators.push(curry(atomic::thermocycler_close_lid, module()));
    }
    creators.push(curry(
        atomic::thermocycler_set_target_lid_temperature,
        TemperatureParams {
            module_id: args.module_id.clone(),
            celsius: args.profile_target_lid_temp,
        },
    ));
    creators.push(curry(atomic::thermocycler_wait_for_lid_temperature, module()));
    creators.push(curry(
        atomic::thermocycler_run_profile,
        RunProfileParams {
            module_id: args.module_id.clone(),
            profile: args.profile.clone(),
            block_max_volume_ul: args.block_max_volume,
        },
    ));
    // The hold is planned against the state the profile leaves behind.
    creators.push(curry(
        thermocycler_state_step,
        ThermocyclerStateArgs {
            module_id: args.module_id.clone(),
            block_target_temp: args.hold.block_target_temp,
            block_max_volume: Some(args.block_max_volume),
            lid_target_temp: args.hold.lid_target_temp,
            lid_open: args.hold.lid_open,
        },
    ));

    tracing::debug!(module = %args.module_id, steps = args.profile.len(), "planned thermocycler profile");
    reduce_command_creators(creators, ctx, state)
}
