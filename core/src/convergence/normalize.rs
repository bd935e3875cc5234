//! Desired-state normalizer: validates an inbound declaration and turns it
//! into the list of files this reconciler should manage.
//!
//! Pure: no filesystem access, no logging side effects beyond debug output.

use std::collections::HashSet;

use crate::data::STATE_FILE;
use crate::error::ReconcileError;
use crate::types::desired::{ComponentSpec, DesiredFile, DesiredFiles, DesiredState};
use crate::types::file::ManagedFile;

/// Config key naming the file inside the managed directory.
pub const KEY_FILE_NAME: &str = "file_name";
/// Config key holding the source locator.
pub const KEY_DOWNLOAD_URL: &str = "download_url";

/// Validate `declaration` against `expected_scope` and extract its files in
/// declaration order.
pub fn normalize(
    declaration: &DesiredState,
    expected_scope: &str,
) -> Result<DesiredFiles, ReconcileError> {
    if declaration.scopes.len() != 1 {
        return Err(ReconcileError::ScopeCount(declaration.scopes.len()));
    }
    let scope = &declaration.scopes[0];
    if scope.id != expected_scope {
        return Err(ReconcileError::ScopeMismatch {
            expected: expected_scope.to_string(),
            received: scope.id.clone(),
        });
    }

    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(scope.components.len());
    for component in &scope.components {
        let desired = to_desired_file(component)?;
        if !seen.insert(desired.file.name.clone()) {
            return Err(config_error(
                component,
                format!("file {} is declared more than once", desired.file.name),
            ));
        }
        files.push(desired);
    }

    tracing::debug!(scope = %scope.id, files = files.len(), "desired state normalized");
    Ok(DesiredFiles {
        scope: scope.id.clone(),
        files,
    })
}

fn to_desired_file(component: &ComponentSpec) -> Result<DesiredFile, ReconcileError> {
    let name = required(component, KEY_FILE_NAME)?;
    let locator = required(component, KEY_DOWNLOAD_URL)?;
    validate_file_name(component, name)?;
    Ok(DesiredFile {
        file: ManagedFile::new(name, locator),
        component_id: component.id.clone(),
        version: component.version.clone(),
    })
}

fn required<'a>(component: &'a ComponentSpec, key: &str) -> Result<&'a str, ReconcileError> {
    match component.config_value(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(config_error(component, format!("missing key {}", key))),
    }
}

/// File names are plain names inside the managed directory.
fn validate_file_name(component: &ComponentSpec, name: &str) -> Result<(), ReconcileError> {
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(config_error(
            component,
            format!("file name {} must not contain path components", name),
        ));
    }
    if name == STATE_FILE {
        return Err(config_error(
            component,
            format!("file name {} is reserved", name),
        ));
    }
    Ok(())
}

fn config_error(component: &ComponentSpec, reason: String) -> ReconcileError {
    ReconcileError::ComponentConfig {
        component: component.id.clone(),
        reason,
    }
}
