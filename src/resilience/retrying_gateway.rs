//! # Retrying Gateway
//!
//! Wraps a [`PersistenceGateway`] with capped exponential backoff for
//! transient connection errors. Before every attempt the connection monitor is
//! consulted; a backend known to be unreachable fails fast instead of burning
//! the retry budget. Fatal persistence errors are never retried.
//!
//! The gateway knows nothing about idempotency or transactions.

use super::connection_monitor::ConnectionMonitor;
use super::retry::RetryPolicy;
use crate::error::PipelineError;
use crate::models::{Record, RecordKey};
use crate::persistence::{BackendError, GatewayOperation, PersistenceGateway};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Backend unreachable before {operation}")]
    ConnectionInterrupted { operation: GatewayOperation },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: GatewayOperation,
        attempts: u32,
        last_error: BackendError,
    },

    #[error("{operation} failed: {reason}")]
    Persistence {
        operation: GatewayOperation,
        reason: String,
    },
}

impl GatewayError {
    pub fn operation(&self) -> GatewayOperation {
        match self {
            Self::ConnectionInterrupted { operation }
            | Self::RetriesExhausted { operation, .. }
            | Self::Persistence { operation, .. } => *operation,
        }
    }
}

impl From<GatewayError> for PipelineError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::ConnectionInterrupted { operation } => {
                PipelineError::ConnectionInterrupted {
                    operation: operation.to_string(),
                }
            }
            GatewayError::RetriesExhausted {
                operation,
                attempts,
                last_error,
            } => PipelineError::RetriesExhausted {
                operation: operation.to_string(),
                attempts,
                last_error: last_error.to_string(),
            },
            GatewayError::Persistence { operation, reason } => {
                PipelineError::PersistenceError(format!("{operation}: {reason}"))
            }
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

pub struct RetryingGateway {
    backend: Arc<dyn PersistenceGateway>,
    monitor: Arc<ConnectionMonitor>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RetryingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingGateway")
            .field("monitor", &self.monitor)
            .field("policy", &self.policy)
            .finish()
    }
}

impl RetryingGateway {
    pub fn new(
        backend: Arc<dyn PersistenceGateway>,
        monitor: Arc<ConnectionMonitor>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            monitor,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    pub fn backend(&self) -> &Arc<dyn PersistenceGateway> {
        &self.backend
    }

    /// Run `attempt` under the default policy
    pub async fn execute<T, F, Fut>(&self, operation: GatewayOperation, attempt: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        self.execute_with_policy(operation, &self.policy, attempt)
            .await
    }

    /// Run `attempt` until it succeeds, fails fatally, or `policy` is exhausted
    pub async fn execute_with_policy<T, F, Fut>(
        &self,
        operation: GatewayOperation,
        policy: &RetryPolicy,
        mut attempt: F,
    ) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt_number = 0u32;

        loop {
            attempt_number += 1;

            if !self.monitor.is_reachable() {
                warn!(
                    operation = %operation,
                    attempt = attempt_number,
                    "🔌 Backend unreachable, failing fast"
                );
                return Err(GatewayError::ConnectionInterrupted { operation });
            }

            match attempt().await {
                Ok(value) => {
                    if attempt_number > 1 {
                        info!(
                            operation = %operation,
                            attempt = attempt_number,
                            "✅ Backend operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(BackendError::Persistence(reason)) => {
                    warn!(
                        operation = %operation,
                        attempt = attempt_number,
                        reason = %reason,
                        "❌ Fatal persistence error, not retrying"
                    );
                    return Err(GatewayError::Persistence { operation, reason });
                }
                Err(error) => {
                    if attempt_number >= max_attempts {
                        warn!(
                            operation = %operation,
                            attempts = attempt_number,
                            error = %error,
                            "❌ Retry budget exhausted"
                        );
                        return Err(GatewayError::RetriesExhausted {
                            operation,
                            attempts: attempt_number,
                            last_error: error,
                        });
                    }

                    let delay = policy.delay_for_attempt(attempt_number);
                    debug!(
                        operation = %operation,
                        attempt = attempt_number,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "🔄 Transient backend error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    pub async fn find_by_id(&self, key: &RecordKey) -> GatewayResult<Option<Record>> {
        let backend = &self.backend;
        self.execute(GatewayOperation::FindById, move || backend.find_by_id(key))
            .await
    }

    pub async fn find_all(&self, collection: &str) -> GatewayResult<Vec<Record>> {
        let backend = &self.backend;
        self.execute(GatewayOperation::FindAll, move || backend.find_all(collection))
            .await
    }

    pub async fn save(&self, record: Record) -> GatewayResult<Record> {
        let backend = &self.backend;
        self.execute(GatewayOperation::Save, move || backend.save(record.clone()))
            .await
    }

    pub async fn delete(&self, key: &RecordKey) -> GatewayResult<bool> {
        let backend = &self.backend;
        self.execute(GatewayOperation::Delete, move || backend.delete(key))
            .await
    }

    pub async fn count_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> GatewayResult<usize> {
        let backend = &self.backend;
        self.execute(GatewayOperation::Count, move || {
            backend.count_where(collection, field, value)
        })
        .await
    }
}
