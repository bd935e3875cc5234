//! Command dispatch table.
//!
//! Each phase command maps to a `CommandRule`: the aggregate status that
//! must have been reported before the command is admitted, the status
//! reported when the command is refused or fails, whether a failure rolls
//! the managed directory back, and the phase that runs it.

use std::fmt;

use super::phases::{self, PhaseContext, PhaseOutcome};
use crate::error::ReconcileError;
use crate::types::feedback::Status;
use crate::types::file::FileAction;
use crate::types::protocol::CommandKind;

pub type PhaseHandler = fn(&mut PhaseContext<'_>, &mut [FileAction]) -> PhaseOutcome;

#[derive(Clone, Copy)]
pub struct CommandRule {
    pub kind: CommandKind,
    /// Status that must be current; `None` admits the command at any point.
    pub requires: Option<Status>,
    pub failure: Status,
    pub rollback_on_failure: bool,
    pub handler: PhaseHandler,
}

impl fmt::Debug for CommandRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRule")
            .field("kind", &self.kind)
            .field("requires", &self.requires)
            .field("failure", &self.failure)
            .field("rollback_on_failure", &self.rollback_on_failure)
            .finish()
    }
}

/// The rule governing `kind`.
pub fn rule(kind: CommandKind) -> CommandRule {
    match kind {
        CommandKind::Download => CommandRule {
            kind,
            requires: Some(Status::Identified),
            failure: Status::DownloadFailure,
            rollback_on_failure: true,
            handler: phases::download,
        },
        CommandKind::Update => CommandRule {
            kind,
            requires: Some(Status::DownloadSuccess),
            failure: Status::UpdateFailure,
            rollback_on_failure: true,
            handler: phases::update,
        },
        CommandKind::Activate => CommandRule {
            kind,
            requires: Some(Status::UpdateSuccess),
            failure: Status::ActivationFailure,
            rollback_on_failure: true,
            handler: phases::activate,
        },
        CommandKind::Cleanup => CommandRule {
            kind,
            requires: None,
            failure: Status::CleanupFailure,
            rollback_on_failure: false,
            handler: phases::cleanup,
        },
    }
}

/// Check a command against the operation it addresses. Refusals carry the
/// message reported upstream.
pub fn admit(
    rule: &CommandRule,
    baseline: &str,
    expected_baseline: &str,
    current: Status,
) -> Result<(), ReconcileError> {
    if baseline != expected_baseline {
        return Err(ReconcileError::Protocol(format!("Unknown baseline {}", baseline)));
    }
    match rule.requires {
        Some(required) if required != current => Err(ReconcileError::Protocol(format!(
            "{} is possible only after status {} is reported",
            rule.kind, required
        ))),
        _ => Ok(()),
    }
}
