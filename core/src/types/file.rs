use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::feedback::{ActionReport, ActionStatus, ComponentRef};

/// Source locator recorded for files discovered on disk before the agent
/// ever managed them.
pub const UNKNOWN_LOCATOR: &str = "unknown";

/// A file under management, identified by its name within the managed
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagedFile {
    #[serde(rename = "file_name")]
    pub name: String,
    #[serde(rename = "download_url")]
    pub source_locator: String,
}

impl ManagedFile {
    pub fn new(name: impl Into<String>, source_locator: impl Into<String>) -> Self {
        ManagedFile {
            name: name.into(),
            source_locator: source_locator.into(),
        }
    }
}

/// The current state: every managed file keyed by name.
///
/// Backed by a `BTreeMap`, so iteration is always in lexicographic name
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    files: BTreeMap<String, String>,
}

impl Inventory {
    pub fn new() -> Self {
        Inventory::default()
    }

    pub fn from_files<I: IntoIterator<Item = ManagedFile>>(files: I) -> Self {
        let mut inventory = Inventory::new();
        for file in files {
            inventory.insert(file);
        }
        inventory
    }

    /// Insert or replace the entry for `file.name`.
    pub fn insert(&mut self, file: ManagedFile) {
        self.files.insert(file.name, file.source_locator);
    }

    pub fn remove(&mut self, name: &str) -> Option<ManagedFile> {
        self.files
            .remove_entry(name)
            .map(|(name, locator)| ManagedFile::new(name, locator))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = ManagedFile> + '_ {
        self.files
            .iter()
            .map(|(name, locator)| ManagedFile::new(name.clone(), locator.clone()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.files
    }
}

impl From<BTreeMap<String, String>> for Inventory {
    fn from(files: BTreeMap<String, String>) -> Self {
        Inventory { files }
    }
}

/// What a reconciliation operation does with one file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// The file already has the desired source; nothing to do.
    None,
    /// The file is new and will be downloaded into the directory.
    Add,
    /// The file exists with a different source and will be replaced.
    Replace,
    /// The file is no longer desired and will be deleted.
    Remove,
}

impl ActionKind {
    /// Derive the action for a desired file given what is currently managed
    /// under the same name.
    pub fn determine(current: Option<&ManagedFile>, desired: &ManagedFile) -> ActionKind {
        match current {
            None => ActionKind::Add,
            Some(c) if c.source_locator != desired.source_locator => ActionKind::Replace,
            Some(_) => ActionKind::None,
        }
    }

    /// Human-readable description reported with the identified action.
    pub fn message(self) -> &'static str {
        match self {
            ActionKind::None => {
                "No changes detected, file will remain in directory with current state."
            }
            ActionKind::Add => "New file will be downloaded and added to directory.",
            ActionKind::Replace => "Existing file will be replaced by a new one.",
            ActionKind::Remove => "Existing file will be removed, no longer needed.",
        }
    }

    /// Whether the action needs content fetched from the desired locator.
    pub fn needs_content(self) -> bool {
        matches!(self, ActionKind::Add | ActionKind::Replace)
    }
}

/// One file's planned change within an operation, plus its progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAction {
    pub current: Option<ManagedFile>,
    pub desired: Option<ManagedFile>,
    pub kind: ActionKind,
    pub component: ComponentRef,
    pub status: ActionStatus,
    pub message: String,
}

impl FileAction {
    /// Name of the file this action touches.
    pub fn file_name(&self) -> &str {
        match (&self.desired, &self.current) {
            (Some(d), _) => &d.name,
            (None, Some(c)) => &c.name,
            (None, None) => "",
        }
    }

    pub fn set(&mut self, status: ActionStatus, message: impl Into<String>) {
        self.status = status;
        self.message = message.into();
    }

    pub fn report(&self) -> ActionReport {
        ActionReport {
            component: self.component.clone(),
            status: self.status,
            message: self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determine_add_when_absent() {
        let desired = ManagedFile::new("f1", "http://x/f1");
        assert_eq!(ActionKind::determine(None, &desired), ActionKind::Add);
    }

    #[test]
    fn determine_none_when_same_locator() {
        let current = ManagedFile::new("f1", "http://x/f1");
        let desired = ManagedFile::new("f1", "http://x/f1");
        assert_eq!(ActionKind::determine(Some(&current), &desired), ActionKind::None);
    }

    #[test]
    fn determine_replace_when_locator_changes() {
        let current = ManagedFile::new("f1", "http://x/f1");
        let desired = ManagedFile::new("f1", "http://x/f1-v2");
        assert_eq!(ActionKind::determine(Some(&current), &desired), ActionKind::Replace);
    }

    #[test]
    fn unknown_locator_is_replaced() {
        let current = ManagedFile::new("f1", UNKNOWN_LOCATOR);
        let desired = ManagedFile::new("f1", "http://x/f1");
        assert_eq!(ActionKind::determine(Some(&current), &desired), ActionKind::Replace);
    }

    #[test]
    fn inventory_iterates_sorted() {
        let inv = Inventory::from_files(vec![
            ManagedFile::new("zeta", "z"),
            ManagedFile::new("alpha", "a"),
            ManagedFile::new("mid", "m"),
        ]);
        let names: Vec<String> = inv.files().map(|f| f.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn inventory_insert_replaces_same_name() {
        let mut inv = Inventory::new();
        inv.insert(ManagedFile::new("f1", "a"));
        inv.insert(ManagedFile::new("f1", "b"));
        assert_eq!(inv.len(), 1);
        assert_eq!(inv.as_map().get("f1").map(String::as_str), Some("b"));
    }

    #[test]
    fn inventory_remove_returns_entry() {
        let mut inv = Inventory::from_files(vec![ManagedFile::new("f1", "a")]);
        assert_eq!(inv.remove("f1"), Some(ManagedFile::new("f1", "a")));
        assert!(inv.is_empty());
        assert_eq!(inv.remove("f1"), None);
    }

    #[test]
    fn managed_file_wire_names() {
        let json = serde_json::to_value(ManagedFile::new("f1", "http://x/f1")).unwrap();
        assert_eq!(json["file_name"], "f1");
        assert_eq!(json["download_url"], "http://x/f1");
    }

    #[test]
    fn only_add_and_replace_need_content() {
        assert!(ActionKind::Add.needs_content());
        assert!(ActionKind::Replace.needs_content());
        assert!(!ActionKind::None.needs_content());
        assert!(!ActionKind::Remove.needs_content());
    }
}
