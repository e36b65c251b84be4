use crate::models::CommandResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdempotencyStatus {
    /// First submission is still executing
    InProgress,
    /// Finished successfully; the cached result is replayed to duplicates
    Completed,
    /// Finished with an error result; also replayed, never re-executed
    Failed,
}

impl IdempotencyStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for IdempotencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Bookkeeping for one idempotency key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub status: IdempotencyStatus,
    pub result: Option<CommandResult>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub(crate) fn in_progress(key: &str, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            key: key.to_string(),
            status: IdempotencyStatus::InProgress,
            result: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Settled and past its TTL, so the key may be forgotten
    pub fn is_reclaimable_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_terminal() && self.is_expired_at(now)
    }
}

/// Outcome of [`IdempotencyGuard::begin`](super::IdempotencyGuard::begin)
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    /// Key unseen (or settled and expired); the caller now owns it and must complete it
    Fresh,
    /// Another submission with this key is executing
    InProgress,
    /// Key already settled; replay this result
    Completed(CommandResult),
}
