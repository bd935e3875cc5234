//! Error taxonomy for the reconciliation core.
//!
//! Every fallible operation in this crate returns `ReconcileError`. The
//! variants group into the classes reported by [`ReconcileError::class`]:
//! validation failures never create an operation, transport and filesystem
//! failures abort a phase and trigger rollback, protocol failures are
//! reported without touching operation state, and rollback failures are
//! terminal.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The desired state did not carry exactly one scope.
    #[error("one domain expected in desired state specification, but got {0}")]
    ScopeCount(usize),

    /// The single scope does not belong to this reconciler.
    #[error("domain id mismatch - expecting {expected}, received {received}")]
    ScopeMismatch { expected: String, received: String },

    /// A component's configuration cannot be turned into a managed file.
    #[error("invalid configuration for component {component}: {reason}")]
    ComponentConfig { component: String, reason: String },

    /// Temporary workspace or backup could not be prepared.
    #[error("cannot prepare workspace ({context}): {source}")]
    Workspace {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The persisted inventory is missing, unreadable, or malformed.
    #[error("cannot read inventory {}: {reason}", path.display())]
    InventoryRead { path: PathBuf, reason: String },

    /// The persisted inventory could not be rewritten.
    #[error("cannot write inventory {}: {source}", path.display())]
    InventoryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fetching content from a source locator failed.
    #[error("could not download file from {locator}: {reason}")]
    Transport { locator: String, reason: String },

    /// A move, copy, or delete inside the managed directory failed.
    #[error("cannot {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A phase command arrived out of order or for an unknown baseline.
    #[error("{0}")]
    Protocol(String),

    /// Restoring the managed directory from backup failed.
    #[error("rollback failed: {0}")]
    Rollback(String),

    /// Agent settings could not be loaded.
    #[error("settings error: {0}")]
    Settings(String),
}

impl ReconcileError {
    /// The error class this variant belongs to, used as a log field.
    pub fn class(&self) -> &'static str {
        match self {
            ReconcileError::ScopeCount(_)
            | ReconcileError::ScopeMismatch { .. }
            | ReconcileError::ComponentConfig { .. } => "validation",
            ReconcileError::Workspace { .. } => "workspace",
            ReconcileError::InventoryRead { .. } => "inventory",
            ReconcileError::Transport { .. } => "transport",
            ReconcileError::InventoryWrite { .. } | ReconcileError::Filesystem { .. } => {
                "filesystem"
            }
            ReconcileError::Protocol(_) => "protocol",
            ReconcileError::Rollback(_) => "rollback",
            ReconcileError::Settings(_) => "settings",
        }
    }

    pub(crate) fn workspace(context: impl Into<String>, source: std::io::Error) -> Self {
        ReconcileError::Workspace {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        ReconcileError::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}
