//! Inventory store: the persisted mapping of managed file name to source
//! locator, kept as a properties file inside the managed directory.
//!
//! The store is the single source of truth for "current state". It is
//! written in exactly two situations: the first time it is needed and no
//! file exists yet (bootstrap from the files already on disk), and by the
//! Activate phase, which rewrites it in full.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::data::props;
use crate::error::ReconcileError;
use crate::types::file::{Inventory, ManagedFile, UNKNOWN_LOCATOR};

/// Name of the inventory file inside the managed directory. Never managed
/// as a file itself.
pub const STATE_FILE: &str = "state.props";

#[derive(Debug, Clone)]
pub struct InventoryStore {
    managed_dir: PathBuf,
    path: PathBuf,
}

impl InventoryStore {
    pub fn new(managed_dir: impl Into<PathBuf>) -> Self {
        let managed_dir = managed_dir.into();
        let path = managed_dir.join(STATE_FILE);
        InventoryStore { managed_dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the persisted inventory. Fails if the file is absent.
    pub fn load(&self) -> Result<Inventory, ReconcileError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.read_error(e))?;
        let entries = props::parse(&content).map_err(|reason| ReconcileError::InventoryRead {
            path: self.path.clone(),
            reason,
        })?;
        Ok(Inventory::from(entries))
    }

    /// Read the persisted inventory, bootstrapping it first if no file exists.
    pub fn load_or_bootstrap(&self) -> Result<Inventory, ReconcileError> {
        if !self.exists() {
            self.bootstrap()?;
        }
        self.load()
    }

    /// Create the inventory from the files currently in the managed
    /// directory, each with an unknown source locator.
    pub fn bootstrap(&self) -> Result<Inventory, ReconcileError> {
        let names = list_managed_files(&self.managed_dir).map_err(|e| self.read_error(e))?;
        let inventory = Inventory::from_files(
            names
                .into_iter()
                .map(|name| ManagedFile::new(name, UNKNOWN_LOCATOR)),
        );
        self.write(&inventory)?;
        info!(
            path = %self.path.display(),
            files = inventory.len(),
            "bootstrapped inventory from managed directory"
        );
        Ok(inventory)
    }

    /// Replace the persisted inventory with `inventory` (truncate and
    /// rewrite).
    pub fn write(&self, inventory: &Inventory) -> Result<(), ReconcileError> {
        let content = props::render(inventory.as_map());
        std::fs::write(&self.path, content).map_err(|source| ReconcileError::InventoryWrite {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), files = inventory.len(), "inventory written");
        Ok(())
    }

    fn read_error(&self, e: std::io::Error) -> ReconcileError {
        ReconcileError::InventoryRead {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

/// Names of the regular files directly inside `dir`, excluding the
/// inventory file, sorted.
pub fn list_managed_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(name = ?raw, "skipping file with non-UTF-8 name");
                continue;
            }
        };
        if name != STATE_FILE {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> InventoryStore {
        InventoryStore::new(dir.path())
    }

    #[test]
    fn load_missing_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = store_in(&dir).load().unwrap_err();
        assert!(matches!(err, ReconcileError::InventoryRead { .. }));
    }

    #[test]
    fn write_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let inv = Inventory::from_files(vec![
            ManagedFile::new("f1", "http://x/f1"),
            ManagedFile::new("f2", "http://x/f2"),
        ]);
        store.write(&inv).unwrap();
        assert_eq!(store.load().unwrap(), inv);
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "f1=http://x/f1\nf2=http://x/f2\n");
    }

    #[test]
    fn write_truncates_previous_content() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .write(&Inventory::from_files(vec![
                ManagedFile::new("f1", "a"),
                ManagedFile::new("f2", "b"),
            ]))
            .unwrap();
        store
            .write(&Inventory::from_files(vec![ManagedFile::new("f2", "b")]))
            .unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "f2=b\n");
    }

    #[test]
    fn bootstrap_discovers_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let store = store_in(&dir);
        let inv = store.load_or_bootstrap().unwrap();
        let files: Vec<ManagedFile> = inv.files().collect();
        assert_eq!(
            files,
            vec![
                ManagedFile::new("a.txt", UNKNOWN_LOCATOR),
                ManagedFile::new("b.txt", UNKNOWN_LOCATOR),
            ]
        );
        assert!(store.exists());
    }

    #[test]
    fn bootstrap_only_once() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.load_or_bootstrap().unwrap();
        std::fs::write(dir.path().join("late.txt"), "x").unwrap();
        // The file now exists, so the late arrival is not discovered.
        assert!(store.load_or_bootstrap().unwrap().is_empty());
    }

    #[test]
    fn malformed_inventory_is_read_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "f1=broken\\").unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, ReconcileError::InventoryRead { .. }));
    }

    #[test]
    fn bootstrap_keeps_names_with_trailing_space() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes "), "n").unwrap();
        std::fs::write(dir.path().join(" lead"), "l").unwrap();

        let store = store_in(&dir);
        store.bootstrap().unwrap();
        let names: Vec<String> = store.load().unwrap().files().map(|f| f.name).collect();
        assert_eq!(names, vec![" lead".to_string(), "notes ".to_string()]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn listing_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff")), "x").unwrap();
        std::fs::write(dir.path().join("good"), "g").unwrap();
        assert_eq!(list_managed_files(dir.path()).unwrap(), vec!["good".to_string()]);
    }

    #[test]
    fn listing_excludes_state_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(STATE_FILE), "").unwrap();
        std::fs::write(dir.path().join("f1"), "1").unwrap();
        assert_eq!(list_managed_files(dir.path()).unwrap(), vec!["f1".to_string()]);
    }
}
