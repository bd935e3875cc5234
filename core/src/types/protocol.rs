use std::fmt;

use serde::{Deserialize, Serialize};

use super::desired::DesiredState;
use super::feedback::FeedbackEvent;
use super::inventory::InventoryGraph;

/// Phase commands an upstream controller can issue against an operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    Download,
    Update,
    Activate,
    Cleanup,
}

impl CommandKind {
    pub const ALL: [CommandKind; 4] = [
        CommandKind::Download,
        CommandKind::Update,
        CommandKind::Activate,
        CommandKind::Cleanup,
    ];

    /// Parse a wire command name. Unrecognized names yield `None`.
    pub fn parse(name: &str) -> Option<CommandKind> {
        match name {
            "DOWNLOAD" => Some(CommandKind::Download),
            "UPDATE" => Some(CommandKind::Update),
            "ACTIVATE" => Some(CommandKind::Activate),
            "CLEANUP" => Some(CommandKind::Cleanup),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Download => "DOWNLOAD",
            CommandKind::Update => "UPDATE",
            CommandKind::Activate => "ACTIVATE",
            CommandKind::Cleanup => "CLEANUP",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase command as received. `command` stays a raw string so that
/// unknown command types can be logged and dropped instead of failing
/// deserialization of the whole message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseCommand {
    pub command: String,
    #[serde(default)]
    pub baseline: String,
}

impl PhaseCommand {
    pub fn new(kind: CommandKind, baseline: impl Into<String>) -> Self {
        PhaseCommand {
            command: kind.as_str().to_string(),
            baseline: baseline.into(),
        }
    }

    pub fn kind(&self) -> Option<CommandKind> {
        CommandKind::parse(&self.command)
    }
}

/// Messages accepted from the control channel, one JSON object per line:
///
/// ```json
/// {"type": "apply", "activity_id": "a-1", "desired_state": {"domains": [...]}}
/// {"type": "command", "activity_id": "a-1", "command": "DOWNLOAD", "baseline": "files"}
/// {"type": "get"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Apply {
        activity_id: String,
        desired_state: DesiredState,
    },
    Command {
        activity_id: String,
        #[serde(flatten)]
        command: PhaseCommand,
    },
    Get {
        #[serde(default)]
        activity_id: String,
    },
}

/// Messages produced toward the control channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Feedback(FeedbackEvent),
    Inventory(InventoryGraph),
}
