//! Drives a heater-shaker from its current state to a requested one.

use crate::atomic;
use crate::command::{ModuleParams, ShakeSpeedParams, TemperatureParams, WaitForDurationParams};
use crate::creator::{CommandCreatorResult, curry, fail, reduce_command_creators};
use crate::entities::InvariantContext;
use crate::errors;
use crate::robot_state::{ModuleState, RobotState};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaterShakerArgs {
    pub module_id: String,
    /// `None` stops the shaker.
    #[serde(default)]
    pub rpm: Option<f64>,
    /// `None` switches the heater off.
    #[serde(default)]
    pub target_temperature: Option<f64>,
    pub latch_open: bool,
    /// Hold time after which heating and shaking both stop.
    #[serde(default)]
    pub timer_seconds: Option<f64>,
}

fn differs(current: Option<f64>, wanted: f64) -> bool {
    current.is_none_or(|c| (c - wanted).abs() > f64::EPSILON)
}

/// Fixed order: close latch, temperature, shake, timed hold, open latch.
pub fn heater_shaker(args: &HeaterShakerArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let Some(ModuleState::HeaterShaker(hs)) = ctx
        .module(&args.module_id)
        .and_then(|_| state.module_state(&args.module_id))
    else {
        return fail(errors::missing_module(&args.module_id));
    };
    if args.latch_open && args.rpm.is_some() {
        return fail(errors::heater_shaker_latch_open());
    }
    let module = || ModuleParams {
        module_id: args.module_id.clone(),
    };

    let mut creators = Vec::new();
    // 1. Latch
    if !args.latch_open && hs.latch_open != Some(false) {
        creators.push(curry(atomic::heater_shaker_close_latch, module()));
    }
    // 2. Temperature
    match args.target_temperature {
        Some(celsius) if differs(hs.target_temp, celsius) => creators.push(curry(
            atomic::heater_shaker_set_target_temperature,
            TemperatureParams {
                module_id: args.module_id.clone(),
                celsius,
            },
        )),
        None if hs.target_temp.is_some() => {
            creators.push(curry(atomic::heater_shaker_deactivate_heater, module()));
        }
        _ => {}
    }
    // 3. Shake
    match args.rpm {
        Some(rpm) if differs(hs.target_speed, rpm) => creators.push(curry(
            atomic::heater_shaker_set_shake_speed,
            ShakeSpeedParams {
                module_id: args.module_id.clone(),
                rpm,
            },
        )),
        None if hs.is_shaking() => creators.push(curry(atomic::heater_shaker_stop_shake, module())),
        _ => {}
    }
    // 4. Timed hold
    if let Some(seconds) = args.timer_seconds.filter(|s| *s > 0.0) {
        creators.push(curry(
            atomic::wait_for_duration,
            WaitForDurationParams { seconds, message: None },
        ));
        if args.rpm.is_some() {
            creators.push(curry(atomic::heater_shaker_stop_shake, module()));
        }
        if args.target_temperature.is_some() {
            creators.push(curry(atomic::heater_shaker_deactivate_heater, module()));
        }
    }
    // 5. Open latch last
    if args.latch_open && hs.latch_open != Some(true) {
        creators.push(curry(atomic::heater_shaker_open_latch, module()));
    }

    tracing::debug!(module = %args.module_id, commands = creators.len(), "planned heater-shaker step");
    reduce_command_creators(creators, ctx, state)
}
