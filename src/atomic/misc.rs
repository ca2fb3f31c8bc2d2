use crate::command::{Command, CommentParams, WaitForDurationParams, WaitForResumeParams};
use crate::creator::{CommandCreatorResult, emit};
use crate::entities::InvariantContext;
use crate::robot_state::RobotState;

/// Free-text note shown in the run log.
pub fn comment(args: &CommentParams, ctx: &InvariantContext, _state: &RobotState) -> CommandCreatorResult {
    emit(vec![Command::Comment(args.clone())], Vec::new(), ctx)
}

/// Timed pause.
pub fn wait_for_duration(
    args: &WaitForDurationParams,
    ctx: &InvariantContext,
    _state: &RobotState,
) -> CommandCreatorResult {
    emit(vec![Command::WaitForDuration(args.clone())], Vec::new(), ctx)
}

/// Pauses until the operator resumes the run.
pub fn wait_for_resume(
    args: &WaitForResumeParams,
    ctx: &InvariantContext,
    _state: &RobotState,
) -> CommandCreatorResult {
    emit(vec![Command::WaitForResume(args.clone())], Vec::new(), ctx)
}
