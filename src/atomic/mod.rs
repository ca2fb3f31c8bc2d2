//! One command creator per physical primitive.
//!
//! Every creator resolves its entities first, then checks the robot state,
//! then the deck hazards, then volumes. The first stage that fails decides the
//! result and no commands are emitted.

pub mod labware;
pub mod misc;
pub mod modules;
pub mod pipetting;
pub mod tips;

pub use labware::*;
pub use misc::*;
pub use modules::*;
pub use pipetting::*;
pub use tips::*;

use crate::creator::CommandCreatorErrors;
use crate::entities::{InvariantContext, PipetteEntity};
use crate::errors;
use crate::robot_state::{ModuleState, RobotState};

pub(crate) fn require_pipette<'c>(
    pipette_id: &str,
    ctx: &'c InvariantContext,
) -> Result<&'c PipetteEntity, CommandCreatorErrors> {
    ctx.pipette(pipette_id)
        .ok_or_else(|| errors::pipette_does_not_exist(pipette_id).into())
}

pub(crate) fn require_tip(pipette_id: &str, state: &RobotState) -> Result<(), CommandCreatorErrors> {
    if state.has_tip(pipette_id) {
        Ok(())
    } else {
        Err(errors::no_tip_on_pipette(pipette_id).into())
    }
}

/// State of a module that is both declared and placed on the deck.
pub(crate) fn require_module<'s>(
    module_id: &str,
    ctx: &InvariantContext,
    state: &'s RobotState,
) -> Result<&'s ModuleState, CommandCreatorErrors> {
    match (ctx.module(module_id), state.module_state(module_id)) {
        (Some(_), Some(module_state)) => Ok(module_state),
        _ => Err(errors::missing_module(module_id).into()),
    }
}

pub(crate) fn unsupported(module_id: &str, action: &str) -> CommandCreatorErrors {
    errors::unsupported_module_action(module_id, action).into()
}
