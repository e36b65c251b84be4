use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a submitted command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    /// Accepted by the pipeline, idempotency key claimed
    #[default]
    Received,
    /// Payload passed structural validation; business invariants not yet checked
    Validated,
    /// Waiting for the user to approve
    Confirming,
    /// Unit of work is committing
    Executing,
    /// All mutations persisted
    Committed,
    /// Execution failed or was interrupted; mutations compensated
    RolledBack,
    /// Refused before any mutation was attempted
    Rejected,
}

impl CommandState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack | Self::Rejected)
    }

    /// Whether the command is waiting on a human
    pub fn is_awaiting_user(&self) -> bool {
        matches!(self, Self::Confirming)
    }

    pub fn is_executing(&self) -> bool {
        matches!(self, Self::Executing)
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Validated => write!(f, "validated"),
            Self::Confirming => write!(f, "confirming"),
            Self::Executing => write!(f, "executing"),
            Self::Committed => write!(f, "committed"),
            Self::RolledBack => write!(f, "rolled_back"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for CommandState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "validated" => Ok(Self::Validated),
            "confirming" => Ok(Self::Confirming),
            "executing" => Ok(Self::Executing),
            "committed" => Ok(Self::Committed),
            "rolled_back" => Ok(Self::RolledBack),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Invalid command state: {s}")),
        }
    }
}
