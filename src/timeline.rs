//! Folds protocol steps into a timeline of frames.
//!
//! Each step is compiled against the state left by the previous successful
//! step. A failing step produces a frame holding only its errors and leaves
//! the state untouched, so later steps are still compiled.

use crate::command::{KeyGenerator, KeyedCommand};
use crate::config::CompilerConfig;
use crate::entities::InvariantContext;
use crate::errors::{CommandCreatorError, CommandCreatorWarning, Result};
use crate::robot_state::{DeckSetup, RobotState};
use crate::steps::StepArgs;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A protocol as read from disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolFile {
    pub invariant_context: InvariantContext,
    #[serde(default)]
    pub initial_deck: DeckSetup,
    pub steps: Vec<StepArgs>,
}

impl ProtocolFile {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Outcome of one step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineFrame {
    pub step_index: usize,
    pub step_type: String,
    pub commands: Vec<KeyedCommand>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CommandCreatorWarning>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<CommandCreatorError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    /// State after the step; unchanged from the previous frame when the step failed.
    pub robot_state: RobotState,
}

impl TimelineFrame {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub frames: Vec<TimelineFrame>,
}

impl Timeline {
    pub fn has_errors(&self) -> bool {
        self.frames.iter().any(|f| !f.is_ok())
    }

    /// Every command in order, across all frames.
    pub fn commands(&self) -> impl Iterator<Item = &KeyedCommand> {
        self.frames.iter().flat_map(|f| f.commands.iter())
    }

    /// All step scripts joined with newlines.
    pub fn python(&self) -> String {
        self.frames
            .iter()
            .filter_map(|f| f.python.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct TimelineCompiler {
    config: CompilerConfig,
}

impl TimelineCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles with the key generator chosen by the configuration.
    pub fn compile(&self, ctx: &InvariantContext, initial: &RobotState, steps: &[StepArgs]) -> Timeline {
        let mut keys = self.config.key_generator();
        self.compile_with_keys(ctx, initial, steps, keys.as_mut())
    }

    pub fn compile_protocol(&self, protocol: ProtocolFile) -> Timeline {
        let initial = protocol.initial_deck.into_robot_state(&protocol.invariant_context);
        self.compile(&protocol.invariant_context, &initial, &protocol.steps)
    }

    pub fn compile_with_keys(
        &self,
        ctx: &InvariantContext,
        initial: &RobotState,
        steps: &[StepArgs],
        keys: &mut dyn KeyGenerator,
    ) -> Timeline {
        let mut state = initial.clone();
        let mut frames = Vec::with_capacity(steps.len());

        for (step_index, step) in steps.iter().enumerate() {
            let step_type = step.step_type();
            tracing::debug!(step_index, step_type, "compiling step");

            let frame = match step.compile(ctx, &state) {
                Ok(output) => {
                    state = state.apply_commands(&output.commands, ctx);
                    TimelineFrame {
                        step_index,
                        step_type: step_type.to_string(),
                        commands: output
                            .commands
                            .into_iter()
                            .map(|command| KeyedCommand {
                                key: keys.next_key(),
                                command,
                            })
                            .collect(),
                        warnings: output.warnings,
                        errors: Vec::new(),
                        python: output.python.filter(|_| self.config.emit_python),
                        robot_state: state.clone(),
                    }
                }
                Err(failed) => {
                    tracing::warn!(
                        step_index,
                        step_type,
                        errors = failed.errors.len(),
                        class = ?failed.errors.first().map(|e| e.error_type.class()),
                        first = %failed.errors.first().map(|e| e.message.as_str()).unwrap_or_default(),
                        "step failed"
                    );
                    TimelineFrame {
                        step_index,
                        step_type: step_type.to_string(),
                        commands: Vec::new(),
                        warnings: failed.warnings,
                        errors: failed.errors,
                        python: None,
                        robot_state: state.clone(),
                    }
                }
            };
            frames.push(frame);
        }

        Timeline { frames }
    }
}

impl Default for TimelineCompiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}
