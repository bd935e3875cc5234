//! Feedback: the progress reports sent upstream while an operation runs.
//!
//! A `FeedbackEvent` carries the operation-wide `Status` together with a
//! snapshot of every per-file action. Both status enums serialize in the
//! SCREAMING_SNAKE_CASE form used on the control channel:
//!
//! ```json
//! {"scope": "files", "activity_id": "a-1", "baseline": "files",
//!  "status": "DOWNLOADING", "message": "",
//!  "actions": [{"component": {"id": "files:f1"},
//!               "status": "DOWNLOAD_SUCCESS", "message": "File downloaded."}]}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation-wide status reported with every feedback event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Identifying,
    Identified,
    IdentificationFailed,
    Completed,
    Downloading,
    DownloadSuccess,
    DownloadFailure,
    Updating,
    UpdateSuccess,
    UpdateFailure,
    Activating,
    ActivationSuccess,
    ActivationFailure,
    RollbackSuccess,
    RollbackFailure,
    CleanupSuccess,
    CleanupFailure,
}

impl Status {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Identifying => "IDENTIFYING",
            Status::Identified => "IDENTIFIED",
            Status::IdentificationFailed => "IDENTIFICATION_FAILED",
            Status::Completed => "COMPLETED",
            Status::Downloading => "DOWNLOADING",
            Status::DownloadSuccess => "DOWNLOAD_SUCCESS",
            Status::DownloadFailure => "DOWNLOAD_FAILURE",
            Status::Updating => "UPDATING",
            Status::UpdateSuccess => "UPDATE_SUCCESS",
            Status::UpdateFailure => "UPDATE_FAILURE",
            Status::Activating => "ACTIVATING",
            Status::ActivationSuccess => "ACTIVATION_SUCCESS",
            Status::ActivationFailure => "ACTIVATION_FAILURE",
            Status::RollbackSuccess => "ROLLBACK_SUCCESS",
            Status::RollbackFailure => "ROLLBACK_FAILURE",
            Status::CleanupSuccess => "CLEANUP_SUCCESS",
            Status::CleanupFailure => "CLEANUP_FAILURE",
        }
    }

    /// The directory may hold changes no Activate committed: a phase ran
    /// without activation following, or a rollback did not complete.
    pub fn is_uncommitted(self) -> bool {
        matches!(
            self,
            Status::Downloading
                | Status::DownloadSuccess
                | Status::Updating
                | Status::UpdateSuccess
                | Status::Activating
                | Status::RollbackFailure
        )
    }

    /// Cleanup results end an operation's life.
    pub fn ends_operation(self) -> bool {
        matches!(
            self,
            Status::Completed | Status::CleanupSuccess | Status::CleanupFailure
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a single file action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Identified,
    Downloading,
    DownloadSuccess,
    DownloadFailure,
    Updating,
    UpdateSuccess,
    UpdateFailure,
    Activating,
    ActivationSuccess,
    ActivationFailure,
}

/// Identifies the declared component an action belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentRef {
    /// `<scope>:<file name>`
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Per-action entry inside a feedback event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionReport {
    pub component: ComponentRef,
    pub status: ActionStatus,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackEvent {
    pub scope: String,
    pub activity_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub baseline: String,
    pub status: Status,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub actions: Vec<ActionReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names_match_as_str() {
        for status in [
            Status::Identifying,
            Status::IdentificationFailed,
            Status::DownloadSuccess,
            Status::ActivationFailure,
            Status::RollbackSuccess,
            Status::CleanupFailure,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn only_mid_operation_statuses_are_uncommitted() {
        assert!(Status::DownloadSuccess.is_uncommitted());
        assert!(Status::UpdateSuccess.is_uncommitted());
        assert!(!Status::Identified.is_uncommitted());
        assert!(!Status::ActivationSuccess.is_uncommitted());
        assert!(!Status::UpdateFailure.is_uncommitted());
        assert!(Status::RollbackFailure.is_uncommitted());
    }

    #[test]
    fn cleanup_and_completed_end_operation() {
        assert!(Status::Completed.ends_operation());
        assert!(Status::CleanupSuccess.ends_operation());
        assert!(Status::CleanupFailure.ends_operation());
        assert!(!Status::DownloadFailure.ends_operation());
    }

    #[test]
    fn event_omits_empty_baseline_and_version() {
        let event = FeedbackEvent {
            scope: "files".into(),
            activity_id: "a1".into(),
            baseline: String::new(),
            status: Status::Identified,
            message: String::new(),
            actions: vec![ActionReport {
                component: ComponentRef { id: "files:f1".into(), version: None },
                status: ActionStatus::Identified,
                message: "m".into(),
            }],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("baseline").is_none());
        assert!(json["actions"][0]["component"].get("version").is_none());
        assert_eq!(json["actions"][0]["status"], "IDENTIFIED");
    }
}
