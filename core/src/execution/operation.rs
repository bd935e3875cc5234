//! Operation: one reconciliation from Identify to Cleanup.
//!
//! An operation is created by a successful Identify and then driven one
//! phase command at a time. It tracks the last aggregate status it
//! reported, which decides what the next command may be:
//!
//! ```text
//! IDENTIFIED -> DOWNLOAD -> DOWNLOAD_SUCCESS -> UPDATE -> UPDATE_SUCCESS
//!            -> ACTIVATE -> ACTIVATION_SUCCESS
//! any status -> CLEANUP  -> CLEANUP_SUCCESS | CLEANUP_FAILURE
//! ```
//!
//! A failed Download, Update or Activate rolls the managed directory back
//! from the backup taken at Identify before the failure is reported. An
//! operation abandoned before activation is rolled back the same way.

use std::path::Path;

use tracing::{debug, error, info, warn};

use super::dispatch::{self, CommandRule};
use super::phases::{self, PhaseContext};
use crate::convergence::planner;
use crate::data::InventoryStore;
use crate::error::ReconcileError;
use crate::infrastructure::{FeedbackSink, Fetcher};
use crate::snapshot::Workspace;
use crate::types::desired::DesiredFiles;
use crate::types::feedback::{ActionReport, FeedbackEvent, Status};
use crate::types::file::FileAction;
use crate::types::protocol::{CommandKind, PhaseCommand};

/// Shared collaborators an operation works with.
#[derive(Clone, Copy)]
pub struct Resources<'a> {
    pub managed_dir: &'a Path,
    /// Parent for temporary workspaces; system temp when `None`.
    pub work_dir: Option<&'a Path>,
    pub store: &'a InventoryStore,
    pub fetcher: &'a dyn Fetcher,
}

/// What became of a phase command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Unknown command type, logged and dropped.
    Ignored,
    /// Refused with the given failure status; operation state unchanged.
    Rejected(Status),
    /// The phase ran and left the operation in this status.
    Executed(Status),
}

/// A feedback event that carries no actions, used before an operation
/// exists.
pub fn bare_feedback(scope: &str, activity_id: &str, status: Status, message: &str) -> FeedbackEvent {
    FeedbackEvent {
        scope: scope.to_string(),
        activity_id: activity_id.to_string(),
        baseline: String::new(),
        status,
        message: message.to_string(),
        actions: Vec::new(),
    }
}

#[derive(Debug)]
pub struct Operation {
    activity_id: String,
    desired: DesiredFiles,
    actions: Vec<FileAction>,
    status: Status,
    workspace: Option<Workspace>,
}

impl Operation {
    /// Run Identify: prepare the workspace, bootstrap the inventory if this
    /// is the first run, back up the managed directory, and plan actions.
    ///
    /// Returns the operation together with whether it has any actions. No
    /// feedback is published here.
    pub fn identify(
        activity_id: &str,
        desired: DesiredFiles,
        res: &Resources<'_>,
    ) -> Result<(Operation, bool), ReconcileError> {
        debug!(activity_id, scope = %desired.scope, "identify - starting");
        let mut workspace = Workspace::create(res.work_dir)?;
        if !res.store.exists() {
            res.store.bootstrap()?;
        }
        workspace.snapshot(res.managed_dir)?;
        let current = res.store.load()?;

        let (actions, has_actions) = planner::identify(&current, &desired);
        debug!(activity_id, actions = actions.len(), "identify - done");
        Ok((
            Operation {
                activity_id: activity_id.to_string(),
                desired,
                actions,
                status: Status::Identified,
                workspace: Some(workspace),
            },
            has_actions,
        ))
    }

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    /// Identifier every phase command must echo; the scope id.
    pub fn baseline(&self) -> &str {
        &self.desired.scope
    }

    /// Last aggregate status reported.
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn actions(&self) -> &[FileAction] {
        &self.actions
    }

    /// Root of the temporary workspace, until cleanup removes it.
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace.as_ref().map(Workspace::root)
    }

    /// Feedback carrying the current action snapshot.
    pub fn feedback(&self, status: Status, message: &str) -> FeedbackEvent {
        self.event(status, message, self.actions.iter().map(FileAction::report).collect())
    }

    fn event(&self, status: Status, message: &str, actions: Vec<ActionReport>) -> FeedbackEvent {
        FeedbackEvent {
            scope: self.desired.scope.clone(),
            activity_id: self.activity_id.clone(),
            baseline: self.baseline().to_string(),
            status,
            message: message.to_string(),
            actions,
        }
    }

    /// Admit and run a phase command, publishing all feedback it produces.
    pub fn execute(
        &mut self,
        command: &PhaseCommand,
        res: &Resources<'_>,
        sink: &mut dyn FeedbackSink,
    ) -> Dispatch {
        let kind = match command.kind() {
            Some(k) => k,
            None => {
                warn!(
                    activity_id = %self.activity_id,
                    command = %command.command,
                    "unknown command type, ignoring"
                );
                return Dispatch::Ignored;
            }
        };
        let rule = dispatch::rule(kind);
        if let Err(e) = dispatch::admit(&rule, &command.baseline, self.baseline(), self.status) {
            warn!(activity_id = %self.activity_id, %kind, error = %e, "command rejected");
            let mut event = self.feedback(rule.failure, &e.to_string());
            event.baseline = command.baseline.clone();
            sink.publish_feedback(&event);
            return Dispatch::Rejected(rule.failure);
        }
        Dispatch::Executed(self.run(&rule, res, sink))
    }

    /// End the operation early, as when it is superseded or the agent shuts
    /// down. Changes a phase made but Activate never committed are rolled
    /// back first; Cleanup then runs unconditionally.
    pub fn abandon(&mut self, res: &Resources<'_>, sink: &mut dyn FeedbackSink) -> Status {
        if self.status.is_uncommitted() {
            info!(activity_id = %self.activity_id, status = %self.status, "abandoning uncommitted operation");
            if let Err(rerr) = self.roll_back_and_report(res, sink) {
                warn!(activity_id = %self.activity_id, error = %rerr, "directory left as is");
            }
        }
        self.run(&dispatch::rule(CommandKind::Cleanup), res, sink)
    }

    /// Remove the workspace without reporting anything. Used for operations
    /// that completed with no actions.
    pub fn discard(mut self) {
        if let Some(ws) = self.workspace.take() {
            if let Err(e) = ws.remove() {
                warn!(activity_id = %self.activity_id, error = %e, "cannot remove workspace");
            }
        }
    }

    fn run(&mut self, rule: &CommandRule, res: &Resources<'_>, sink: &mut dyn FeedbackSink) -> Status {
        info!(activity_id = %self.activity_id, command = %rule.kind, "running phase");
        let outcome = {
            let mut ctx = PhaseContext {
                managed_dir: res.managed_dir,
                store: res.store,
                fetcher: res.fetcher,
                workspace: &mut self.workspace,
            };
            (rule.handler)(&mut ctx, &mut self.actions)
        };

        for step in outcome.steps {
            self.status = step.status;
            sink.publish_feedback(&self.event(step.status, "", step.actions));
        }

        let err = match outcome.error {
            None => {
                self.status = outcome.status;
                sink.publish_feedback(&self.feedback(outcome.status, &outcome.message));
                info!(activity_id = %self.activity_id, status = %outcome.status, "phase finished");
                return self.status;
            }
            Some(err) => err,
        };

        error!(
            activity_id = %self.activity_id,
            command = %rule.kind,
            class = err.class(),
            error = %err,
            "phase failed"
        );
        let mut message = outcome.message;
        let mut terminal = outcome.status;
        if rule.rollback_on_failure {
            if let Err(rerr) = self.roll_back_and_report(res, sink) {
                message = format!("{}; {}", message, rerr);
                terminal = Status::RollbackFailure;
            }
        }
        sink.publish_feedback(&self.feedback(outcome.status, &message));
        self.status = terminal;
        self.status
    }

    /// Restore the managed directory from the backup and publish
    /// ROLLBACK_SUCCESS or ROLLBACK_FAILURE.
    fn roll_back_and_report(
        &mut self,
        res: &Resources<'_>,
        sink: &mut dyn FeedbackSink,
    ) -> Result<(), ReconcileError> {
        let restored = {
            let ctx = PhaseContext {
                managed_dir: res.managed_dir,
                store: res.store,
                fetcher: res.fetcher,
                workspace: &mut self.workspace,
            };
            phases::rollback(&ctx)
        };
        match restored {
            Ok(outcome) => {
                let summary = outcome.summary();
                info!(activity_id = %self.activity_id, "{}", summary);
                sink.publish_feedback(&self.feedback(Status::RollbackSuccess, &summary));
                Ok(())
            }
            Err(rerr) => {
                error!(activity_id = %self.activity_id, error = %rerr, "rollback failed");
                sink.publish_feedback(&self.feedback(Status::RollbackFailure, &rerr.to_string()));
                Err(rerr)
            }
        }
    }
}
