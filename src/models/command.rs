//! Command model
//!
//! A [`Command`] is the caller's description of one user-triggered operation.
//! It is built before submission and handed to the pipeline by value, so it
//! cannot change once submitted. The pipeline stamps the requester identity
//! from the authentication provider when it receives the command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// The operations the pipeline knows how to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    RegisterAccount,
    InsertBanner,
    ChangePassword,
    InsertTag,
    DeleteAddress,
    RecordJustification,
}

impl CommandKind {
    pub const ALL: [CommandKind; 6] = [
        Self::RegisterAccount,
        Self::InsertBanner,
        Self::ChangePassword,
        Self::InsertTag,
        Self::DeleteAddress,
        Self::RecordJustification,
    ];
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegisterAccount => write!(f, "register_account"),
            Self::InsertBanner => write!(f, "insert_banner"),
            Self::ChangePassword => write!(f, "change_password"),
            Self::InsertTag => write!(f, "insert_tag"),
            Self::DeleteAddress => write!(f, "delete_address"),
            Self::RecordJustification => write!(f, "record_justification"),
        }
    }
}

impl std::str::FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register_account" => Ok(Self::RegisterAccount),
            "insert_banner" => Ok(Self::InsertBanner),
            "change_password" => Ok(Self::ChangePassword),
            "insert_tag" => Ok(Self::InsertTag),
            "delete_address" => Ok(Self::DeleteAddress),
            "record_justification" => Ok(Self::RecordJustification),
            _ => Err(format!("Invalid command kind: {s}")),
        }
    }
}

/// A user-triggered operation submitted to the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Opaque identifier of this submission
    id: String,

    /// Caller-chosen key identifying the logical submission across retries
    idempotency_key: String,

    /// Which handler executes the command
    kind: CommandKind,

    /// Raw user input, validated by the handler
    payload: Map<String, Value>,

    /// Identity of the caller, empty until stamped at RECEIVED
    requester_id: String,

    /// When the caller built the command
    created_at: DateTime<Utc>,
}

impl Command {
    pub fn new(
        kind: CommandKind,
        idempotency_key: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            idempotency_key: idempotency_key.into(),
            kind,
            payload,
            requester_id: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Build a command from a JSON object literal.
    ///
    /// Non-object values produce an empty payload, which every handler rejects
    /// during validation.
    pub fn from_json(kind: CommandKind, idempotency_key: impl Into<String>, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(kind, idempotency_key, payload)
    }

    pub(crate) fn stamped(mut self, requester_id: impl Into<String>) -> Self {
        self.requester_id = requester_id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn requester_id(&self) -> &str {
        &self.requester_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_kind_string_conversion() {
        for kind in CommandKind::ALL {
            assert_eq!(kind.to_string().parse::<CommandKind>().unwrap(), kind);
        }
        assert!("drop_tables".parse::<CommandKind>().is_err());
    }

    #[test]
    fn test_from_json_discards_non_objects() {
        let cmd = Command::from_json(CommandKind::InsertTag, "k", json!(["not", "an", "object"]));
        assert!(cmd.payload().is_empty());
        assert!(cmd.requester_id().is_empty());

        let cmd = Command::from_json(CommandKind::InsertTag, "k", json!({"name": "Beach"}));
        assert_eq!(cmd.payload()["name"], json!("Beach"));
    }

    #[test]
    fn test_stamping_keeps_identity() {
        let cmd = Command::from_json(CommandKind::DeleteAddress, "key-1", json!({}));
        let id = cmd.id().to_string();
        let stamped = cmd.stamped("operator-7");
        assert_eq!(stamped.id(), id);
        assert_eq!(stamped.requester_id(), "operator-7");
        assert_eq!(stamped.idempotency_key(), "key-1");
    }
}
