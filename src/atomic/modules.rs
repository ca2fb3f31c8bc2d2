//! Module creators: magnet, temperature, heater-shaker, thermocycler and
//! absorbance reader.
//!
//! The temperature creators dispatch on the module type so a single step can
//! drive any heating module.

use super::{require_module, unsupported};
use crate::command::{
    AbsorbanceInitializeParams, AbsorbanceReadParams, BlockTemperatureParams, Command, EngageParams,
    ModuleParams, RunProfileParams, ShakeSpeedParams, TemperatureParams,
};
use crate::creator::{CommandCreatorResult, emit, fail};
use crate::entities::InvariantContext;
use crate::errors;
use crate::robot_state::{ModuleState, RobotState};

fn module(id: &str) -> ModuleParams {
    ModuleParams {
        module_id: id.to_string(),
    }
}

// --- Magnetic module ---

/// Raises the magnets of a magnetic module to `args.height`.
pub fn engage_magnet(args: &EngageParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let ModuleState::Magnetic(_) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "engaging a magnet"));
    };
    emit(vec![Command::EngageMagnet(args.clone())], Vec::new(), ctx)
}

/// Lowers the magnets.
pub fn disengage_magnet(args: &ModuleParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let ModuleState::Magnetic(_) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "disengaging a magnet"));
    };
    emit(vec![Command::DisengageMagnet(args.clone())], Vec::new(), ctx)
}

// --- Temperature (any heating module) ---

/// Sets a target temperature on any heating module. A thermocycler gets a block target.
pub fn set_temperature(args: &TemperatureParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let command = match require_module(&args.module_id, ctx, state)? {
        ModuleState::Temperature(_) => Command::TemperatureSetTarget(args.clone()),
        ModuleState::HeaterShaker(_) => Command::HeaterShakerSetTargetTemperature(args.clone()),
        ModuleState::Thermocycler(_) => Command::ThermocyclerSetBlockTemperature(BlockTemperatureParams {
            module_id: args.module_id.clone(),
            celsius: args.celsius,
            block_max_volume_ul: None,
        }),
        ModuleState::Magnetic(_) | ModuleState::AbsorbanceReader(_) => {
            return Err(unsupported(&args.module_id, "setting a temperature"));
        }
    };
    emit(vec![command], Vec::new(), ctx)
}

/// Waits for the temperature set by an earlier step.
///
/// Fails when no target has been set; warns when `args.celsius` differs from it.
pub fn await_temperature(args: &TemperatureParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let (target, command) = match require_module(&args.module_id, ctx, state)? {
        ModuleState::Temperature(m) => (m.target_temperature, Command::TemperatureWait(args.clone())),
        ModuleState::HeaterShaker(m) => (
            m.target_temp,
            Command::HeaterShakerWaitForTemperature(module(&args.module_id)),
        ),
        ModuleState::Thermocycler(m) => (
            m.block_target_temp,
            Command::ThermocyclerWaitForBlockTemperature(module(&args.module_id)),
        ),
        ModuleState::Magnetic(_) | ModuleState::AbsorbanceReader(_) => {
            return Err(unsupported(&args.module_id, "waiting for a temperature"));
        }
    };
    let Some(target) = target else {
        return fail(errors::missing_temperature_step(&args.module_id));
    };
    let mut warnings = Vec::new();
    if (target - args.celsius).abs() > f64::EPSILON {
        warnings.push(errors::temperature_may_not_be_reached(target, args.celsius));
    }
    emit(vec![command], warnings, ctx)
}

/// Switches heating off. A thermocycler emits lid then block.
pub fn deactivate_temperature(args: &ModuleParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let commands = match require_module(&args.module_id, ctx, state)? {
        ModuleState::Temperature(_) => vec![Command::TemperatureDeactivate(args.clone())],
        ModuleState::HeaterShaker(_) => vec![Command::HeaterShakerDeactivateHeater(args.clone())],
        ModuleState::Thermocycler(_) => vec![
            Command::ThermocyclerDeactivateLid(args.clone()),
            Command::ThermocyclerDeactivateBlock(args.clone()),
        ],
        ModuleState::Magnetic(_) | ModuleState::AbsorbanceReader(_) => {
            return Err(unsupported(&args.module_id, "deactivating a temperature"));
        }
    };
    emit(commands, Vec::new(), ctx)
}

// --- Heater-shaker ---

/// Opens the labware latch; refused while shaking.
pub fn heater_shaker_open_latch(args: &ModuleParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let ModuleState::HeaterShaker(hs) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "opening a labware latch"));
    };
    if hs.is_shaking() {
        return fail(errors::heater_shaker_is_shaking());
    }
    emit(vec![Command::HeaterShakerOpenLatch(args.clone())], Vec::new(), ctx)
}

/// Closes the labware latch.
pub fn heater_shaker_close_latch(args: &ModuleParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let ModuleState::HeaterShaker(_) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "closing a labware latch"));
    };
    emit(vec![Command::HeaterShakerCloseLatch(args.clone())], Vec::new(), ctx)
}

/// Heater-shaker only variant of [`set_temperature`].
pub fn heater_shaker_set_target_temperature(
    args: &TemperatureParams,
    ctx: &InvariantContext,
    state: &RobotState,
) -> CommandCreatorResult {
    let ModuleState::HeaterShaker(_) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "heater-shaker heating"));
    };
    emit(
        vec![Command::HeaterShakerSetTargetTemperature(args.clone())],
        Vec::new(),
        ctx,
    )
}

/// Turns the heater-shaker heater off.
pub fn heater_shaker_deactivate_heater(
    args: &ModuleParams,
    ctx: &InvariantContext,
    state: &RobotState,
) -> CommandCreatorResult {
    let ModuleState::HeaterShaker(_) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "heater-shaker heating"));
    };
    emit(vec![Command::HeaterShakerDeactivateHeater(args.clone())], Vec::new(), ctx)
}

/// Shaking needs the latch confirmed closed.
pub fn heater_shaker_set_shake_speed(
    args: &ShakeSpeedParams,
    ctx: &InvariantContext,
    state: &RobotState,
) -> CommandCreatorResult {
    let ModuleState::HeaterShaker(hs) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "shaking"));
    };
    if !hs.is_latch_closed() {
        return fail(errors::heater_shaker_latch_open());
    }
    emit(vec![Command::HeaterShakerSetShakeSpeed(args.clone())], Vec::new(), ctx)
}

/// Stops shaking.
pub fn heater_shaker_stop_shake(args: &ModuleParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let ModuleState::HeaterShaker(_) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "shaking"));
    };
    emit(vec![Command::HeaterShakerDeactivateShaker(args.clone())], Vec::new(), ctx)
}

// --- Thermocycler ---

macro_rules! thermocycler_creator {
    ($(#[$meta:meta])* $name:ident, $params:ty, $variant:ident, $action:literal) => {
        $(#[$meta])*
        pub fn $name(args: &$params, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
            let ModuleState::Thermocycler(_) = require_module(&args.module_id, ctx, state)? else {
                return Err(unsupported(&args.module_id, $action));
            };
            emit(vec![Command::$variant(args.clone())], Vec::new(), ctx)
        }
    };
}

thermocycler_creator!(
    /// Sets the block target.
    thermocycler_set_target_block_temperature,
    BlockTemperatureParams,
    ThermocyclerSetBlockTemperature,
    "block temperature control"
);
thermocycler_creator!(
    /// Blocks until the block reaches its target.
    thermocycler_wait_for_block_temperature,
    ModuleParams,
    ThermocyclerWaitForBlockTemperature,
    "block temperature control"
);
thermocycler_creator!(
    /// Sets the heated lid target.
    thermocycler_set_target_lid_temperature,
    TemperatureParams,
    ThermocyclerSetLidTemperature,
    "lid temperature control"
);
thermocycler_creator!(
    /// Blocks until the lid reaches its target.
    thermocycler_wait_for_lid_temperature,
    ModuleParams,
    ThermocyclerWaitForLidTemperature,
    "lid temperature control"
);
thermocycler_creator!(
    /// Turns block temperature control off.
    thermocycler_deactivate_block,
    ModuleParams,
    ThermocyclerDeactivateBlock,
    "block temperature control"
);
thermocycler_creator!(
    /// Turns the lid heater off.
    thermocycler_deactivate_lid,
    ModuleParams,
    ThermocyclerDeactivateLid,
    "lid temperature control"
);
thermocycler_creator!(
    /// Opens the lid so pipettes and the gripper can reach the plate.
    thermocycler_open_lid,
    ModuleParams,
    ThermocyclerOpenLid,
    "opening a thermocycler lid"
);
thermocycler_creator!(
    /// Closes the lid.
    thermocycler_close_lid,
    ModuleParams,
    ThermocyclerCloseLid,
    "closing a thermocycler lid"
);
thermocycler_creator!(
    /// Runs the whole profile as one command; the block ends at the last step's temperature.
    thermocycler_run_profile,
    RunProfileParams,
    ThermocyclerRunProfile,
    "running a profile"
);

// --- Absorbance reader ---

/// Opens the reader lid with the gripper.
pub fn absorbance_reader_open_lid(args: &ModuleParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let ModuleState::AbsorbanceReader(_) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "opening a reader lid"));
    };
    if !ctx.has_gripper() {
        return fail(errors::absorbance_reader_no_gripper());
    }
    emit(vec![Command::AbsorbanceReaderOpenLid(args.clone())], Vec::new(), ctx)
}

/// Closes the reader lid with the gripper.
pub fn absorbance_reader_close_lid(args: &ModuleParams, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let ModuleState::AbsorbanceReader(_) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "closing a reader lid"));
    };
    if !ctx.has_gripper() {
        return fail(errors::absorbance_reader_no_gripper());
    }
    emit(vec![Command::AbsorbanceReaderCloseLid(args.clone())], Vec::new(), ctx)
}

/// Configures measure mode and wavelengths for later reads.
pub fn absorbance_reader_initialize(
    args: &AbsorbanceInitializeParams,
    ctx: &InvariantContext,
    state: &RobotState,
) -> CommandCreatorResult {
    let ModuleState::AbsorbanceReader(_) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "absorbance initialization"));
    };
    emit(vec![Command::AbsorbanceReaderInitialize(args.clone())], Vec::new(), ctx)
}

/// Takes a reading; the reader must have been initialized.
pub fn absorbance_reader_read(
    args: &AbsorbanceReadParams,
    ctx: &InvariantContext,
    state: &RobotState,
) -> CommandCreatorResult {
    let ModuleState::AbsorbanceReader(ar) = require_module(&args.module_id, ctx, state)? else {
        return Err(unsupported(&args.module_id, "absorbance reads"));
    };
    if ar.initialization.is_none() {
        return fail(errors::absorbance_reader_no_initialization(&args.module_id));
    }
    emit(vec![Command::AbsorbanceReaderRead(args.clone())], Vec::new(), ctx)
}
