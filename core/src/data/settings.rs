use std::path::Path;

use crate::error::ReconcileError;
use crate::types::config::AgentSettings;

/// Returns sensible defaults for all settings fields.
pub fn default_settings() -> AgentSettings {
    AgentSettings::default()
}

/// Load `AgentSettings` from a YAML file. Fields absent from the file keep
/// their defaults.
pub fn load(path: &Path) -> Result<AgentSettings, ReconcileError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ReconcileError::Settings(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse(&content)
}

/// Parse settings from a YAML string. An empty document yields defaults.
pub fn parse(content: &str) -> Result<AgentSettings, ReconcileError> {
    if content.trim().is_empty() {
        return Ok(default_settings());
    }
    let settings: AgentSettings = serde_yaml::from_str(content)
        .map_err(|e| ReconcileError::Settings(format!("invalid settings: {}", e)))?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &AgentSettings) -> Result<(), ReconcileError> {
    if settings.domain.trim().is_empty() {
        return Err(ReconcileError::Settings("domain must not be empty".into()));
    }
    if settings.managed_dir.as_os_str().is_empty() {
        return Err(ReconcileError::Settings("managed_dir must not be empty".into()));
    }
    Ok(())
}
