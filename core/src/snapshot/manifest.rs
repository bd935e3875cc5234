//! Directory manifest: file names with SHA-256 content hashes, captured
//! when the managed directory is backed up and compared structurally during
//! rollback.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::warn;

/// Content fingerprint of the regular files directly inside a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Hash every regular file directly inside `dir`. Subdirectories are
    /// not part of the managed set and are skipped.
    pub fn capture(dir: &Path) -> io::Result<Manifest> {
        let mut entries = BTreeMap::new();
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
            entries.insert(name, hash_file(&entry.path())?);
        }
        Ok(Manifest { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Names that were added, removed, or changed between `self` and `other`,
    /// sorted.
    pub fn differences(&self, other: &Manifest) -> Vec<String> {
        let mut changed: Vec<String> = self
            .entries
            .iter()
            .filter(|(name, hash)| other.entries.get(*name) != Some(*hash))
            .map(|(name, _)| name.clone())
            .collect();
        changed.extend(
            other
                .entries
                .keys()
                .filter(|name| !self.entries.contains_key(*name))
                .cloned(),
        );
        changed.sort();
        changed
    }
}

/// SHA-256 of a file's contents, hex encoded.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
