//! Restore the managed directory from the workspace backup after a failed
//! phase.
//!
//! The live directory is fingerprinted and compared with the manifest taken
//! at backup time. Equal manifests mean nothing was touched. Otherwise every
//! live file is deleted and every backed-up file copied back over whatever
//! non-directory entry holds its name, after which the directory is
//! fingerprinted again to prove the restore.

use std::path::Path;

use tracing::{debug, info};

use super::manifest::Manifest;
use super::workspace::Workspace;
use crate::error::ReconcileError;

/// What a successful restore had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The live directory already matched the backup.
    Unchanged,
    /// Live files were replaced with the backup.
    Restored { removed: usize, restored: usize },
}

impl RestoreOutcome {
    pub fn summary(&self) -> String {
        match self {
            RestoreOutcome::Unchanged => "managed directory unchanged".to_string(),
            RestoreOutcome::Restored { removed, restored } => format!(
                "managed directory restored from backup ({} removed, {} restored)",
                removed, restored
            ),
        }
    }
}

/// Bring `managed_dir` back to the state recorded in `workspace`.
pub fn restore(managed_dir: &Path, workspace: &Workspace) -> Result<RestoreOutcome, ReconcileError> {
    let live = Manifest::capture(managed_dir)
        .map_err(|e| ReconcileError::Rollback(format!("cannot fingerprint managed directory: {}", e)))?;
    let expected = workspace.manifest();
    if live == *expected {
        debug!("rollback: managed directory matches backup");
        return Ok(RestoreOutcome::Unchanged);
    }
    debug!(changed = ?live.differences(expected), "rollback: managed directory differs from backup");

    let mut removed = 0;
    for name in live.names() {
        let path = managed_dir.join(name);
        std::fs::remove_file(&path).map_err(|e| {
            ReconcileError::Rollback(format!("cannot remove {}: {}", path.display(), e))
        })?;
        removed += 1;
    }

    let mut restored = 0;
    for name in expected.names() {
        let source = workspace.backup_dir().join(name);
        let target = managed_dir.join(name);
        // Copying onto a symlink would write through it.
        if let Ok(meta) = std::fs::symlink_metadata(&target) {
            if !meta.is_dir() {
                std::fs::remove_file(&target).map_err(|e| {
                    ReconcileError::Rollback(format!("cannot replace {}: {}", target.display(), e))
                })?;
                removed += 1;
            }
        }
        std::fs::copy(&source, &target).map_err(|e| {
            ReconcileError::Rollback(format!("cannot restore {}: {}", target.display(), e))
        })?;
        restored += 1;
    }

    let after = Manifest::capture(managed_dir)
        .map_err(|e| ReconcileError::Rollback(format!("cannot verify restore: {}", e)))?;
    if after != *expected {
        return Err(ReconcileError::Rollback(format!(
            "managed directory still differs from backup: {:?}",
            after.differences(expected)
        )));
    }

    info!(removed, restored, "rollback: managed directory restored from backup");
    Ok(RestoreOutcome::Restored { removed, restored })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> (TempDir, TempDir, Workspace) {
        let parent = TempDir::new().unwrap();
        let managed = TempDir::new().unwrap();
        for (name, body) in files {
            std::fs::write(managed.path().join(name), body).unwrap();
        }
        let mut ws = Workspace::create(Some(parent.path())).unwrap();
        ws.snapshot(managed.path()).unwrap();
        (parent, managed, ws)
    }

    #[test]
    fn untouched_directory_is_unchanged() {
        let (_parent, managed, ws) = setup(&[("a", "1")]);
        assert_eq!(restore(managed.path(), &ws).unwrap(), RestoreOutcome::Unchanged);
    }

    #[test]
    fn restores_modified_added_and_deleted_files() {
        let (_parent, managed, ws) = setup(&[("a", "1"), ("b", "2")]);
        std::fs::write(managed.path().join("a"), "changed").unwrap();
        std::fs::remove_file(managed.path().join("b")).unwrap();
        std::fs::write(managed.path().join("c"), "new").unwrap();

        let outcome = restore(managed.path(), &ws).unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored { removed: 2, restored: 2 });
        assert_eq!(std::fs::read_to_string(managed.path().join("a")).unwrap(), "1");
        assert_eq!(std::fs::read_to_string(managed.path().join("b")).unwrap(), "2");
        assert!(!managed.path().join("c").exists());
        assert_eq!(Manifest::capture(managed.path()).unwrap(), *ws.manifest());
    }

    #[test]
    fn restore_into_emptied_directory() {
        let (_parent, managed, ws) = setup(&[("a", "1")]);
        std::fs::remove_file(managed.path().join("a")).unwrap();
        let outcome = restore(managed.path(), &ws).unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored { removed: 0, restored: 1 });
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_over_backed_up_file_is_replaced() {
        let (_parent, managed, ws) = setup(&[("a", "1"), ("b", "2")]);
        let link = managed.path().join("a");
        std::fs::remove_file(&link).unwrap();
        std::os::unix::fs::symlink("/nonexistent/dir/a", &link).unwrap();

        let outcome = restore(managed.path(), &ws).unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored { removed: 2, restored: 2 });
        assert!(!std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "1");
    }

    #[test]
    fn missing_managed_directory_fails() {
        let (_parent, managed, ws) = setup(&[("a", "1")]);
        let gone = managed.path().to_path_buf();
        drop(managed);
        let err = restore(&gone, &ws).unwrap_err();
        assert!(matches!(err, ReconcileError::Rollback(_)));
    }

    #[test]
    fn summary_text() {
        assert_eq!(RestoreOutcome::Unchanged.summary(), "managed directory unchanged");
        assert!(RestoreOutcome::Restored { removed: 1, restored: 2 }
            .summary()
            .contains("1 removed, 2 restored"));
    }
}
