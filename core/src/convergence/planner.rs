//! Action planner: diffs the current inventory against the desired files
//! and emits one typed action per file.
//!
//! The planner is stateless: it takes the current inventory and the
//! normalized desired files and returns the actions needed to converge them.
//! It never touches the filesystem itself.

use crate::types::desired::DesiredFiles;
use crate::types::feedback::{ActionStatus, ComponentRef};
use crate::types::file::{ActionKind, FileAction, Inventory, ManagedFile};

/// Compute the per-file actions that move `current` to `desired`.
///
/// # Returns
///
/// The actions, in this order:
/// 1. One action per desired file, in declaration order (`Add`, `Replace`
///    or `None`)
/// 2. One `Remove` per inventory entry not desired, in lexicographic name
///    order
///
/// together with whether the list is non-empty. A desired file that needs
/// no change still yields a `None` action and counts.
pub fn identify(current: &Inventory, desired: &DesiredFiles) -> (Vec<FileAction>, bool) {
    let mut remaining = current.clone();
    let mut actions = Vec::with_capacity(desired.files.len() + current.len());

    for entry in &desired.files {
        let existing = remaining.remove(&entry.file.name);
        let kind = ActionKind::determine(existing.as_ref(), &entry.file);
        tracing::debug!(file = %entry.file.name, ?kind, "{}", kind.message());
        actions.push(new_action(
            &desired.scope,
            existing,
            Some(entry.file.clone()),
            kind,
            entry.version.clone(),
        ));
    }

    for leftover in remaining.files() {
        tracing::debug!(file = %leftover.name, kind = ?ActionKind::Remove, "{}", ActionKind::Remove.message());
        actions.push(new_action(&desired.scope, Some(leftover), None, ActionKind::Remove, None));
    }

    let has_actions = !actions.is_empty();
    (actions, has_actions)
}

fn new_action(
    scope: &str,
    current: Option<ManagedFile>,
    desired: Option<ManagedFile>,
    kind: ActionKind,
    version: Option<String>,
) -> FileAction {
    let name = desired
        .as_ref()
        .or(current.as_ref())
        .map(|f| f.name.clone())
        .unwrap_or_default();
    FileAction {
        current,
        desired,
        kind,
        component: ComponentRef {
            id: format!("{}:{}", scope, name),
            version,
        },
        status: ActionStatus::Identified,
        message: kind.message().to_string(),
    }
}
