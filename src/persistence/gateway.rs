use crate::models::{Record, RecordKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Raw backend failures, typed so retry logic never has to inspect messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Network blip or dropped connection; expected to succeed on retry
    #[error("Transient connection error: {0}")]
    TransientConnection(String),

    /// Constraint violation, corrupted data, or any other failure retry cannot fix
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl BackendError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::TransientConnection(reason.into())
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Persistence(reason.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientConnection(_))
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Backend operation names, used for logging and fault targeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOperation {
    FindById,
    FindAll,
    Save,
    Delete,
    Count,
}

impl fmt::Display for GatewayOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::FindAll => write!(f, "find_all"),
            Self::Save => write!(f, "save"),
            Self::Delete => write!(f, "delete"),
            Self::Count => write!(f, "count"),
        }
    }
}

/// CRUD access to the remote backend.
///
/// Implementations must be safe to call concurrently. A `save` is an upsert;
/// `delete` reports whether a record was removed.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn find_by_id(&self, key: &RecordKey) -> BackendResult<Option<Record>>;

    async fn find_all(&self, collection: &str) -> BackendResult<Vec<Record>>;

    async fn save(&self, record: Record) -> BackendResult<Record>;

    async fn delete(&self, key: &RecordKey) -> BackendResult<bool>;

    /// Number of records in `collection` whose `field` equals `value`
    async fn count_where(&self, collection: &str, field: &str, value: &Value)
        -> BackendResult<usize>;
}
