//! Absorbance reader step: initialize, read, or move the lid.

use crate::atomic;
use crate::command::{AbsorbanceInitializeParams, AbsorbanceReadParams, ModuleParams};
use crate::creator::{CommandCreatorResult, curry, fail, reduce_command_creators};
use crate::entities::InvariantContext;
use crate::errors;
use crate::robot_state::{MeasureMode, ModuleState, RobotState};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AbsorbanceReaderAction {
    #[serde(rename_all = "camelCase")]
    Initialize {
        measure_mode: MeasureMode,
        sample_wavelengths: Vec<u32>,
        #[serde(default)]
        reference_wavelength: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Read {
        #[serde(default)]
        file_name: Option<String>,
    },
    Lid { open: bool },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsorbanceReaderArgs {
    pub module_id: String,
    #[serde(flatten)]
    pub action: AbsorbanceReaderAction,
}

/// Initialize and read both run with the lid shut, so the lid is closed first
/// unless it already is.
pub fn absorbance_reader(args: &AbsorbanceReaderArgs, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
    let Some(ModuleState::AbsorbanceReader(reader)) = ctx
        .module(&args.module_id)
        .and_then(|_| state.module_state(&args.module_id))
    else {
        return fail(errors::missing_module(&args.module_id));
    };
    let module = || ModuleParams {
        module_id: args.module_id.clone(),
    };
    let close_first = reader.lid_open != Some(false);

    let mut creators = Vec::new();
    match &args.action {
        AbsorbanceReaderAction::Initialize {
            measure_mode,
            sample_wavelengths,
            reference_wavelength,
        } => {
            if close_first {
                creators.push(curry(atomic::absorbance_reader_close_lid, module()));
            }
            creators.push(curry(
                atomic::absorbance_reader_initialize,
                AbsorbanceInitializeParams {
                    module_id: args.module_id.clone(),
                    measure_mode: *measure_mode,
                    sample_wavelengths: sample_wavelengths.clone(),
                    reference_wavelength: *reference_wavelength,
                },
            ));
        }
        AbsorbanceReaderAction::Read { file_name } => {
            if close_first {
                creators.push(curry(atomic::absorbance_reader_close_lid, module()));
            }
            creators.push(curry(
                atomic::absorbance_reader_read,
                AbsorbanceReadParams {
                    module_id: args.module_id.clone(),
                    file_name: file_name.clone(),
                },
            ));
        }
        AbsorbanceReaderAction::Lid { open: true } => {
            creators.push(curry(atomic::absorbance_reader_open_lid, module()));
        }
        AbsorbanceReaderAction::Lid { open: false } => {
            creators.push(curry(atomic::absorbance_reader_close_lid, module()));
        }
    }
    reduce_command_creators(creators, ctx, state)
}
