//! Desired state as declared on the control channel, and its normalized form.

use serde::{Deserialize, Serialize};

use super::file::ManagedFile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyValuePair {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A declared item. Only its opaque `config` pairs say which file it is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub config: Vec<KeyValuePair>,
}

impl ComponentSpec {
    /// Value recorded under `key`, if any. When a key repeats, the last
    /// occurrence wins.
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config
            .iter()
            .rev()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }
}

/// One scope of a desired-state declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopeDeclaration {
    pub id: String,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

/// Inbound desired-state document. Must carry exactly one scope to be
/// accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DesiredState {
    #[serde(rename = "domains", default)]
    pub scopes: Vec<ScopeDeclaration>,
}

impl DesiredState {
    /// Convenience constructor for a single-scope declaration.
    pub fn single(scope: impl Into<String>, components: Vec<ComponentSpec>) -> Self {
        DesiredState {
            scopes: vec![ScopeDeclaration {
                id: scope.into(),
                components,
            }],
        }
    }
}

/// A validated desired file plus the component it was declared by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredFile {
    pub file: ManagedFile,
    pub component_id: String,
    pub version: Option<String>,
}

/// Normalized desired state: the target file list for one scope, in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredFiles {
    pub scope: String,
    pub files: Vec<DesiredFile>,
}
