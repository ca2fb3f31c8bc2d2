//! Step arguments: one variant per step kind a protocol can contain.

use crate::atomic;
use crate::command::{CommentParams, MoveLabwareParams};
use crate::compound::{
    AbsorbanceReaderArgs, ConsolidateArgs, DistributeArgs, HeaterShakerArgs, MagnetArgs, MixArgs, PauseArgs,
    TemperatureArgs, ThermocyclerProfileArgs, ThermocyclerStateArgs, TransferArgs,
};
use crate::compound;
use crate::creator::CommandCreatorResult;
use crate::entities::InvariantContext;
use crate::robot_state::RobotState;
use serde::{Deserialize, Serialize};

/// How a move-liquid step maps sources onto destinations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "camelCase")]
pub enum MoveLiquidArgs {
    Single(TransferArgs),
    MultiAspirate(ConsolidateArgs),
    MultiDispense(DistributeArgs),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
pub enum StepArgs {
    MoveLiquid(MoveLiquidArgs),
    Mix(MixArgs),
    Pause(PauseArgs),
    Magnet(MagnetArgs),
    Temperature(TemperatureArgs),
    HeaterShaker(HeaterShakerArgs),
    Thermocycler(ThermocyclerStateArgs),
    ThermocyclerProfile(ThermocyclerProfileArgs),
    AbsorbanceReader(AbsorbanceReaderArgs),
    MoveLabware(MoveLabwareParams),
    Comment(CommentParams),
}

impl StepArgs {
    pub fn step_type(&self) -> &'static str {
        match self {
            Self::MoveLiquid(MoveLiquidArgs::Single(_)) => "transfer",
            Self::MoveLiquid(MoveLiquidArgs::MultiAspirate(_)) => "consolidate",
            Self::MoveLiquid(MoveLiquidArgs::MultiDispense(_)) => "distribute",
            Self::Mix(_) => "mix",
            Self::Pause(_) => "pause",
            Self::Magnet(_) => "magnet",
            Self::Temperature(_) => "temperature",
            Self::HeaterShaker(_) => "heaterShaker",
            Self::Thermocycler(_) => "thermocycler",
            Self::ThermocyclerProfile(_) => "thermocyclerProfile",
            Self::AbsorbanceReader(_) => "absorbanceReader",
            Self::MoveLabware(_) => "moveLabware",
            Self::Comment(_) => "comment",
        }
    }

    /// Runs the creator for this step against `state`.
    pub fn compile(&self, ctx: &InvariantContext, state: &RobotState) -> CommandCreatorResult {
        match self {
            Self::MoveLiquid(MoveLiquidArgs::Single(args)) => compound::transfer(args, ctx, state),
            Self::MoveLiquid(MoveLiquidArgs::MultiAspirate(args)) => compound::consolidate(args, ctx, state),
            Self::MoveLiquid(MoveLiquidArgs::MultiDispense(args)) => compound::distribute(args, ctx, state),
            Self::Mix(args) => compound::mix(args, ctx, state),
            Self::Pause(args) => compound::pause(args, ctx, state),
            Self::Magnet(args) => compound::magnet(args, ctx, state),
            Self::Temperature(args) => compound::temperature(args, ctx, state),
            Self::HeaterShaker(args) => compound::heater_shaker(args, ctx, state),
            Self::Thermocycler(args) => compound::thermocycler_state_step(args, ctx, state),
            Self::ThermocyclerProfile(args) => compound::thermocycler_profile_step(args, ctx, state),
            Self::AbsorbanceReader(args) => compound::absorbance_reader(args, ctx, state),
            Self::MoveLabware(args) => atomic::move_labware(args, ctx, state),
            Self::Comment(args) => atomic::comment(args, ctx, state),
        }
    }
}
