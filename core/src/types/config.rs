use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Transport settings for fetching file content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchSettings {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Overall per-request timeout. `None` leaves requests unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: None,
        }
    }
}

fn default_connect_timeout() -> u64 {
    15
}

/// Everything the reconciler needs to know about its host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSettings {
    /// Scope this reconciler answers for; desired states for any other
    /// scope are rejected.
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Directory whose files are reconciled.
    #[serde(default = "default_managed_dir")]
    pub managed_dir: PathBuf,
    /// Parent for per-operation temporary workspaces. System temp when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    #[serde(default)]
    pub fetch: FetchSettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            domain: default_domain(),
            managed_dir: default_managed_dir(),
            work_dir: None,
            fetch: FetchSettings::default(),
        }
    }
}

impl AgentSettings {
    pub fn new(domain: impl Into<String>, managed_dir: impl Into<PathBuf>) -> Self {
        AgentSettings {
            domain: domain.into(),
            managed_dir: managed_dir.into(),
            ..AgentSettings::default()
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }
}

fn default_domain() -> String {
    "files".into()
}

fn default_managed_dir() -> PathBuf {
    PathBuf::from("./fileagent")
}
