//! The command creator contract and the reducer that chains creators.
//!
//! A creator is a pure function of `(args, invariant context, robot state)`.
//! It either emits commands (plus optional warnings and a scripting fragment)
//! or reports errors, never both. Compound creators are built by currying
//! several creators and folding them with [`reduce_command_creators`], which
//! re-derives the robot state between calls.

use crate::command::Command;
use crate::entities::InvariantContext;
use crate::errors::{CommandCreatorError, CommandCreatorWarning};
use crate::python;
use crate::robot_state::RobotState;
use serde::{Deserialize, Serialize};

/// Successful creator output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandsAndWarnings {
    pub commands: Vec<Command>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CommandCreatorWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
}

/// Failed creator output. Carries the warnings gathered before the failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandCreatorErrors {
    pub errors: Vec<CommandCreatorError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CommandCreatorWarning>,
}

impl From<CommandCreatorError> for CommandCreatorErrors {
    fn from(error: CommandCreatorError) -> Self {
        Self {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }
}

impl From<Vec<CommandCreatorError>> for CommandCreatorErrors {
    fn from(errors: Vec<CommandCreatorError>) -> Self {
        Self {
            errors,
            warnings: Vec::new(),
        }
    }
}

pub type CommandCreatorResult = Result<CommandsAndWarnings, CommandCreatorErrors>;

/// Signature shared by every creator.
pub type CommandCreator<A> = fn(&A, &InvariantContext, &RobotState) -> CommandCreatorResult;

/// A creator with its arguments already bound.
pub struct CurriedCommandCreator(Box<dyn Fn(&InvariantContext, &RobotState) -> CommandCreatorResult>);

impl CurriedCommandCreator {
    pub fn new(f: impl Fn(&InvariantContext, &RobotState) -> CommandCreatorResult + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn call(&self, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
        (self.0)(ctx, state)
    }
}

impl std::fmt::Debug for CurriedCommandCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CurriedCommandCreator")
    }
}

/// Binds `args` to `creator`.
pub fn curry<A: 'static>(creator: CommandCreator<A>, args: A) -> CurriedCommandCreator {
    CurriedCommandCreator::new(move |ctx, state| creator(&args, ctx, state))
}

/// Wraps commands into a successful result, rendering their scripting text.
pub fn emit(
    commands: Vec<Command>,
    warnings: Vec<CommandCreatorWarning>,
    ctx: &InvariantContext,
) -> CommandCreatorResult {
    let python = python::render_commands(&commands, ctx);
    Ok(CommandsAndWarnings {
        commands,
        warnings,
        python,
    })
}

/// Fails with a single error.
pub fn fail(error: CommandCreatorError) -> CommandCreatorResult {
    Err(error.into())
}

/// Fails with every error collected by a validation pass, if there are any.
pub fn fail_if_any(errors: Vec<CommandCreatorError>) -> Result<(), CommandCreatorErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

/// Applies curried creators left to right, threading the robot state.
///
/// The first creator that fails halts the fold: its errors are returned along
/// with every warning gathered so far, and no commands.
pub fn reduce_command_creators(
    creators: Vec<CurriedCommandCreator>,
    ctx: &InvariantContext,
    initial: &RobotState,
) -> CommandCreatorResult {
    let mut state = initial.clone();
    let mut commands = Vec::new();
    let mut warnings = Vec::new();
    let mut python_lines: Vec<String> = Vec::new();

    for creator in creators {
        match creator.call(ctx, &state) {
            Ok(next) => {
                state = state.apply_commands(&next.commands, ctx);
                commands.extend(next.commands);
                warnings.extend(next.warnings);
                if let Some(py) = next.python
                    && !py.is_empty()
                {
                    python_lines.push(py);
                }
            }
            Err(mut failed) => {
                warnings.append(&mut failed.warnings);
                return Err(CommandCreatorErrors {
                    errors: failed.errors,
                    warnings,
                });
            }
        }
    }

    Ok(CommandsAndWarnings {
        commands,
        warnings,
        python: (!python_lines.is_empty()).then(|| python_lines.join("\n")),
    })
}
