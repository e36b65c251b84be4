use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// Events that drive command state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CommandEvent {
    /// Structural validation passed
    Validate,
    /// Handler asked for user approval
    RequestConfirmation,
    /// Begin committing the unit of work
    Execute,
    /// Unit of work committed
    Commit,
    /// Execution failed or was interrupted, with the reason
    RollBack(String),
    /// Refused before execution
    Reject(ErrorKind),
    /// Key already settled; outcome replayed from the idempotency cache
    Replay { success: bool },
}

impl CommandEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::RequestConfirmation => "request_confirmation",
            Self::Execute => "execute",
            Self::Commit => "commit",
            Self::RollBack(_) => "roll_back",
            Self::Reject(_) => "reject",
            Self::Replay { .. } => "replay",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Commit | Self::RollBack(_) | Self::Reject(_) | Self::Replay { .. }
        )
    }
}
