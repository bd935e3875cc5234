//! Phase implementations: download, update, activate, cleanup, rollback.
//!
//! A phase works on the operation's action list and returns a
//! `PhaseOutcome` describing what happened: the intermediate progress frames
//! in the order they occurred, the final aggregate status, and the error
//! that stopped it, if any. Phases never publish feedback and never roll
//! back on their own; the operation does both once the phase has returned.
//!
//! Every phase is a single attempt. A failure on one action stops the phase
//! and leaves the remaining actions untouched.

use std::path::Path;

use tracing::{debug, warn};

use crate::data::InventoryStore;
use crate::error::ReconcileError;
use crate::infrastructure::Fetcher;
use crate::snapshot::{self, RestoreOutcome, Workspace};
use crate::types::feedback::{ActionReport, ActionStatus, Status};
use crate::types::file::{ActionKind, FileAction, Inventory};

pub const MSG_DOWNLOADED: &str = "File downloaded.";
pub const MSG_ADDED: &str = "File added to directory.";
pub const MSG_REPLACED: &str = "File replaced in directory.";
pub const MSG_REMOVED: &str = "File removed from directory.";
pub const MSG_RECORDED: &str = "Desired file recorded in inventory.";

// ---------------------------------------------------------------------------
// PhaseContext / PhaseOutcome
// ---------------------------------------------------------------------------

/// What a phase may touch.
pub struct PhaseContext<'a> {
    pub managed_dir: &'a Path,
    pub store: &'a InventoryStore,
    pub fetcher: &'a dyn Fetcher,
    /// The operation's workspace; `None` once cleaned up.
    pub workspace: &'a mut Option<Workspace>,
}

/// Snapshot of all actions at one point of a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub status: Status,
    pub actions: Vec<ActionReport>,
}

#[derive(Debug)]
pub struct PhaseOutcome {
    /// Intermediate frames, oldest first.
    pub steps: Vec<Progress>,
    /// Aggregate status the phase ended in.
    pub status: Status,
    pub message: String,
    pub error: Option<ReconcileError>,
}

impl PhaseOutcome {
    fn succeeded(steps: Vec<Progress>, status: Status) -> Self {
        PhaseOutcome {
            steps,
            status,
            message: String::new(),
            error: None,
        }
    }

    fn failed(steps: Vec<Progress>, status: Status, error: ReconcileError) -> Self {
        PhaseOutcome {
            steps,
            status,
            message: error.to_string(),
            error: Some(error),
        }
    }
}

fn frame(status: Status, actions: &[FileAction]) -> Progress {
    Progress {
        status,
        actions: actions.iter().map(FileAction::report).collect(),
    }
}

fn missing_workspace() -> ReconcileError {
    ReconcileError::workspace(
        "operation workspace",
        std::io::Error::new(std::io::ErrorKind::NotFound, "workspace already cleaned up"),
    )
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// Fetch the content of every Add/Replace action into the download
/// directory.
pub fn download(ctx: &mut PhaseContext<'_>, actions: &mut [FileAction]) -> PhaseOutcome {
    debug!("downloading - starting");
    let mut steps = Vec::new();
    let workspace = match ctx.workspace.as_ref() {
        Some(ws) => ws,
        None => return PhaseOutcome::failed(steps, Status::DownloadFailure, missing_workspace()),
    };

    for i in 0..actions.len() {
        if !actions[i].kind.needs_content() {
            continue;
        }
        let desired = match actions[i].desired.clone() {
            Some(d) => d,
            None => continue,
        };
        let message = actions[i].message.clone();
        actions[i].set(ActionStatus::Downloading, message);
        steps.push(frame(Status::Downloading, actions));

        match ctx.fetcher.fetch(&desired.source_locator, &workspace.staged(&desired.name)) {
            Ok(bytes) => {
                debug!(file = %desired.name, bytes, "downloaded");
                actions[i].set(ActionStatus::DownloadSuccess, MSG_DOWNLOADED);
            }
            Err(e) => {
                actions[i].set(ActionStatus::DownloadFailure, e.to_string());
                debug!("downloading - failed");
                return PhaseOutcome::failed(steps, Status::DownloadFailure, e);
            }
        }
    }

    debug!("downloading - done");
    PhaseOutcome::succeeded(steps, Status::DownloadSuccess)
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Apply the downloaded content to the managed directory: move staged files
/// in for Add/Replace, delete live files for Remove.
pub fn update(ctx: &mut PhaseContext<'_>, actions: &mut [FileAction]) -> PhaseOutcome {
    debug!("updating - starting");
    let mut steps = Vec::new();
    let workspace = match ctx.workspace.as_ref() {
        Some(ws) => ws,
        None => return PhaseOutcome::failed(steps, Status::UpdateFailure, missing_workspace()),
    };

    for i in 0..actions.len() {
        let kind = actions[i].kind;
        if kind == ActionKind::None {
            let message = actions[i].message.clone();
            actions[i].set(ActionStatus::UpdateSuccess, message);
            continue;
        }

        let name = actions[i].file_name().to_string();
        let message = actions[i].message.clone();
        actions[i].set(ActionStatus::Updating, message);
        steps.push(frame(Status::Updating, actions));

        let live = ctx.managed_dir.join(&name);
        let result = match kind {
            ActionKind::Remove => remove_live(&live).map(|_| MSG_REMOVED),
            ActionKind::Replace => move_file(&workspace.staged(&name), &live).map(|_| MSG_REPLACED),
            _ => move_file(&workspace.staged(&name), &live).map(|_| MSG_ADDED),
        };
        match result {
            Ok(done) => actions[i].set(ActionStatus::UpdateSuccess, done),
            Err(e) => {
                actions[i].set(ActionStatus::UpdateFailure, e.to_string());
                debug!("updating - failed");
                return PhaseOutcome::failed(steps, Status::UpdateFailure, e);
            }
        }
    }

    debug!("updating - done");
    PhaseOutcome::succeeded(steps, Status::UpdateSuccess)
}

/// Delete a live file. A file that is already gone is what was wanted.
fn remove_live(path: &Path) -> Result<(), ReconcileError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "file to remove was already absent");
            Ok(())
        }
        Err(e) => Err(ReconcileError::filesystem("remove", path, e)),
    }
}

/// Move `src` to `dst`, falling back to copy-and-delete across filesystems.
fn move_file(src: &Path, dst: &Path) -> Result<(), ReconcileError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    std::fs::copy(src, dst).map_err(|e| ReconcileError::filesystem("copy", src, e))?;
    std::fs::remove_file(src).map_err(|e| ReconcileError::filesystem("remove", src, e))
}

// ---------------------------------------------------------------------------
// Activate
// ---------------------------------------------------------------------------

/// Rewrite the persisted inventory from the desired side of every
/// Add/Replace/None action. Removed files drop out by omission.
pub fn activate(ctx: &mut PhaseContext<'_>, actions: &mut [FileAction]) -> PhaseOutcome {
    debug!("activating - starting");
    let mut steps = Vec::new();
    let mut inventory = Inventory::new();
    let mut retained = Vec::new();

    for (i, action) in actions.iter_mut().enumerate() {
        if action.kind == ActionKind::Remove {
            continue;
        }
        if let Some(desired) = &action.desired {
            inventory.insert(desired.clone());
            let message = action.message.clone();
            action.set(ActionStatus::Activating, message);
            retained.push(i);
        }
    }
    steps.push(frame(Status::Activating, actions));

    match ctx.store.write(&inventory) {
        Ok(()) => {
            for i in retained {
                actions[i].set(ActionStatus::ActivationSuccess, MSG_RECORDED);
            }
            debug!(files = inventory.len(), "activating - done");
            PhaseOutcome::succeeded(steps, Status::ActivationSuccess)
        }
        Err(e) => {
            for i in retained {
                actions[i].set(ActionStatus::ActivationFailure, e.to_string());
            }
            debug!("activating - failed");
            PhaseOutcome::failed(steps, Status::ActivationFailure, e)
        }
    }
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

/// Delete the operation's whole temporary workspace.
pub fn cleanup(ctx: &mut PhaseContext<'_>, _actions: &mut [FileAction]) -> PhaseOutcome {
    debug!("cleanup - starting");
    let outcome = match ctx.workspace.take() {
        None => PhaseOutcome::succeeded(Vec::new(), Status::CleanupSuccess),
        Some(ws) => match ws.remove() {
            Ok(()) => PhaseOutcome::succeeded(Vec::new(), Status::CleanupSuccess),
            Err(e) => PhaseOutcome::failed(
                Vec::new(),
                Status::CleanupFailure,
                ReconcileError::workspace("remove workspace", e),
            ),
        },
    };
    debug!("cleanup - done");
    outcome
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

/// Restore the managed directory from the backup taken at Identify.
pub fn rollback(ctx: &PhaseContext<'_>) -> Result<RestoreOutcome, ReconcileError> {
    debug!("rollback - starting");
    let workspace = ctx
        .workspace
        .as_ref()
        .ok_or_else(|| ReconcileError::Rollback("no backup available".into()))?;
    let outcome = snapshot::restore(ctx.managed_dir, workspace);
    debug!("rollback - done");
    outcome
}
