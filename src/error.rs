//! # Pipeline Error Taxonomy
//!
//! Every failure a caller can observe from the command pipeline collapses into a
//! [`PipelineError`]. Lower layers keep their own error enums
//! ([`GatewayError`](crate::resilience::GatewayError),
//! [`TransactionError`](crate::transaction::TransactionError)) and convert into
//! this one at the pipeline boundary, which is the single place that decides a
//! command's terminal state and idempotency outcome.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Stable classification of a pipeline failure, shared with presenters and
/// cached inside idempotency records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Payload failed structural validation; the user must correct it
    InvalidInput,
    /// Current state forbids the command (capacity, uniqueness, ownership)
    BusinessRuleViolation,
    /// Another submission with the same key is still executing
    DuplicateRequest,
    /// The user declined the confirmation prompt
    UserCancelled,
    /// The backend was known to be unreachable before an attempt
    ConnectionInterrupted,
    /// Transient failures consumed the whole retry budget
    RetriesExhausted,
    /// Fatal, non-retryable backend failure
    PersistenceError,
    /// A rollback could not undo every applied mutation
    CompensationFailed,
    /// An external cancellation signal aborted the command
    Cancelled,
    /// The pipeline deadline elapsed
    TimedOut,
}

impl ErrorKind {
    /// Whether a *new* submission (fresh idempotency key) may reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionInterrupted | Self::RetriesExhausted | Self::TimedOut
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::BusinessRuleViolation => write!(f, "business_rule_violation"),
            Self::DuplicateRequest => write!(f, "duplicate_request"),
            Self::UserCancelled => write!(f, "user_cancelled"),
            Self::ConnectionInterrupted => write!(f, "connection_interrupted"),
            Self::RetriesExhausted => write!(f, "retries_exhausted"),
            Self::PersistenceError => write!(f, "persistence_error"),
            Self::CompensationFailed => write!(f, "compensation_failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    #[error("Request already processed for idempotency key {key}")]
    DuplicateRequest { key: String },

    #[error("Cancelled by user: {0}")]
    UserCancelled(String),

    #[error("Connection to server interrupted during {operation}")]
    ConnectionInterrupted { operation: String },

    #[error("Retries exhausted for {operation} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Compensation failed for transaction {transaction_id}: {reason}")]
    CompensationFailed {
        transaction_id: String,
        reason: String,
    },

    #[error("Command cancelled")]
    Cancelled,

    #[error("Command timed out after {0:?}")]
    TimedOut(Duration),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::BusinessRuleViolation(_) => ErrorKind::BusinessRuleViolation,
            Self::DuplicateRequest { .. } => ErrorKind::DuplicateRequest,
            Self::UserCancelled(_) => ErrorKind::UserCancelled,
            Self::ConnectionInterrupted { .. } => ErrorKind::ConnectionInterrupted,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::PersistenceError(_) => ErrorKind::PersistenceError,
            Self::CompensationFailed { .. } => ErrorKind::CompensationFailed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::TimedOut(_) => ErrorKind::TimedOut,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Stable, user-actionable message shown by the presentation layer.
    ///
    /// Validation and business-rule messages are already phrased for the user
    /// and pass through unchanged; infrastructure failures never leak internals.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) | Self::BusinessRuleViolation(msg) => msg.clone(),
            Self::DuplicateRequest { .. } => "Request already processed".to_string(),
            Self::UserCancelled(_) | Self::Cancelled => "Operation cancelled".to_string(),
            Self::ConnectionInterrupted { .. } => {
                "Connection to the server interrupted. Please try again.".to_string()
            }
            Self::RetriesExhausted { .. } => {
                "The server is not responding. Please try again later.".to_string()
            }
            Self::PersistenceError(_) => "The operation could not be saved.".to_string(),
            Self::CompensationFailed { .. } => {
                "The operation failed and could not be fully undone. Please contact support."
                    .to_string()
            }
            Self::TimedOut(_) => "The operation timed out. Please try again.".to_string(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn business_rule(msg: impl Into<String>) -> Self {
        Self::BusinessRuleViolation(msg.into())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        PipelineError::InvalidInput(format!("Malformed payload: {error}"))
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
