//! Per-operation temporary workspace.
//!
//! Layout under a fresh temporary root:
//!
//! ```text
//! file_agent.XXXX/
//!   download/   staged content fetched during Download
//!   backup/     copy of the managed directory taken at Identify
//! ```
//!
//! The workspace owns its root; dropping it removes the whole tree, and
//! `remove` does so explicitly and reports failures.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use super::manifest::Manifest;
use crate::error::ReconcileError;

#[derive(Debug)]
pub struct Workspace {
    root: TempDir,
    download_dir: PathBuf,
    backup_dir: PathBuf,
    manifest: Manifest,
}

impl Workspace {
    /// Create an empty workspace under `parent`, or the system temp
    /// directory when `parent` is `None`.
    pub fn create(parent: Option<&Path>) -> Result<Workspace, ReconcileError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("file_agent.");
        let root = match parent {
            Some(p) => builder.tempdir_in(p),
            None => builder.tempdir(),
        }
        .map_err(|e| ReconcileError::workspace("create temporary directory", e))?;

        let download_dir = root.path().join("download");
        let backup_dir = root.path().join("backup");
        std::fs::create_dir(&download_dir)
            .map_err(|e| ReconcileError::workspace("create download directory", e))?;
        std::fs::create_dir(&backup_dir)
            .map_err(|e| ReconcileError::workspace("create backup directory", e))?;

        debug!(root = %root.path().display(), "workspace created");
        Ok(Workspace {
            root,
            download_dir,
            backup_dir,
            manifest: Manifest::default(),
        })
    }

    /// Copy every regular file of `managed_dir` into the backup directory and
    /// record the manifest of what was copied.
    pub fn snapshot(&mut self, managed_dir: &Path) -> Result<(), ReconcileError> {
        let entries = std::fs::read_dir(managed_dir)
            .map_err(|e| ReconcileError::workspace("read managed directory", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ReconcileError::workspace("read managed directory", e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| ReconcileError::workspace("read managed directory", e))?
                .is_file();
            if !is_file {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, "not backing up file with non-UTF-8 name");
                    continue;
                }
            };
            let target = self.backup_dir.join(name);
            std::fs::copy(entry.path(), &target).map_err(|e| {
                ReconcileError::workspace(format!("back up {}", entry.path().display()), e)
            })?;
        }
        self.manifest = Manifest::capture(&self.backup_dir)
            .map_err(|e| ReconcileError::workspace("hash backup", e))?;
        debug!(files = self.manifest.len(), "managed directory backed up");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Manifest of the backup taken by `snapshot`.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Where the downloaded content for `name` is staged.
    pub fn staged(&self, name: &str) -> PathBuf {
        self.download_dir.join(name)
    }

    /// Delete the whole workspace tree.
    pub fn remove(self) -> std::io::Result<()> {
        let root = self.root.path().to_path_buf();
        self.root.close()?;
        debug!(root = %root.display(), "workspace removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir as Dir;

    #[test]
    fn create_lays_out_subdirectories() {
        let parent = Dir::new().unwrap();
        let ws = Workspace::create(Some(parent.path())).unwrap();
        assert!(ws.root().starts_with(parent.path()));
        assert!(ws.root().join("download").is_dir());
        assert!(ws.backup_dir().is_dir());
        assert_eq!(ws.staged("f1"), ws.root().join("download").join("f1"));
    }

    #[test]
    fn create_in_missing_parent_fails() {
        let parent = Dir::new().unwrap();
        let err = Workspace::create(Some(&parent.path().join("nope"))).unwrap_err();
        assert!(matches!(err, ReconcileError::Workspace { .. }));
    }

    #[test]
    fn snapshot_copies_files_and_records_manifest() {
        let parent = Dir::new().unwrap();
        let managed = Dir::new().unwrap();
        std::fs::write(managed.path().join("a"), "alpha").unwrap();
        std::fs::write(managed.path().join("b"), "beta").unwrap();
        std::fs::create_dir(managed.path().join("skipme")).unwrap();

        let mut ws = Workspace::create(Some(parent.path())).unwrap();
        ws.snapshot(managed.path()).unwrap();

        assert_eq!(std::fs::read_to_string(ws.backup_dir().join("a")).unwrap(), "alpha");
        assert_eq!(ws.manifest().len(), 2);
        assert_eq!(*ws.manifest(), Manifest::capture(managed.path()).unwrap());
        assert!(!ws.backup_dir().join("skipme").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn snapshot_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let parent = Dir::new().unwrap();
        let managed = Dir::new().unwrap();
        std::fs::write(managed.path().join(OsStr::from_bytes(b"bad\xff")), "x").unwrap();
        std::fs::write(managed.path().join("good"), "g").unwrap();

        let mut ws = Workspace::create(Some(parent.path())).unwrap();
        ws.snapshot(managed.path()).unwrap();
        assert_eq!(ws.manifest().names().collect::<Vec<_>>(), vec!["good"]);
        assert_eq!(std::fs::read_dir(ws.backup_dir()).unwrap().count(), 1);
    }

    #[test]
    fn snapshot_of_missing_directory_fails() {
        let parent = Dir::new().unwrap();
        let mut ws = Workspace::create(Some(parent.path())).unwrap();
        let err = ws.snapshot(&parent.path().join("missing")).unwrap_err();
        assert_eq!(err.class(), "workspace");
    }

    #[test]
    fn remove_deletes_tree() {
        let parent = Dir::new().unwrap();
        let ws = Workspace::create(Some(parent.path())).unwrap();
        std::fs::write(ws.staged("f1"), "x").unwrap();
        let root = ws.root().to_path_buf();
        ws.remove().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn drop_deletes_tree() {
        let parent = Dir::new().unwrap();
        let root = {
            let ws = Workspace::create(Some(parent.path())).unwrap();
            ws.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
