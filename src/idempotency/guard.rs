//! # Idempotency Guard
//!
//! Per-key deduplication of command submissions. The record map is a
//! [`DashMap`], so `begin` is atomic per key through the shard's entry lock
//! while distinct keys proceed without coordination.

use super::record::{GuardDecision, IdempotencyRecord, IdempotencyStatus};
use crate::models::CommandResult;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("No idempotency record for key {0}")]
    UnknownKey(String),

    #[error("Idempotency record for key {key} is already {status}")]
    AlreadyTerminal {
        key: String,
        status: IdempotencyStatus,
    },
}

#[derive(Debug)]
pub struct IdempotencyGuard {
    records: DashMap<String, IdempotencyRecord>,
    ttl: chrono::Duration,
}

impl IdempotencyGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365)),
        }
    }

    /// Claim `key` or report what an earlier submission did with it.
    ///
    /// A duplicate hit leaves the existing record untouched. An expired
    /// settled record is replaced as if the key had never been seen; an
    /// IN_PROGRESS record is never reclaimed, whatever its age.
    pub fn begin(&self, key: &str) -> GuardDecision {
        let now = Utc::now();
        match self.records.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(IdempotencyRecord::in_progress(key, now, self.ttl));
                GuardDecision::Fresh
            }
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_reclaimable_at(now) {
                    debug!(idempotency_key = key, "Expired idempotency record replaced");
                    occupied.insert(IdempotencyRecord::in_progress(key, now, self.ttl));
                    return GuardDecision::Fresh;
                }

                let record = occupied.get();
                match (&record.status, &record.result) {
                    (IdempotencyStatus::InProgress, _) => GuardDecision::InProgress,
                    (_, Some(result)) => GuardDecision::Completed(result.clone()),
                    (_, None) => GuardDecision::InProgress,
                }
            }
        }
    }

    /// Settle `key` with `result`, refreshing its expiry.
    ///
    /// Returns the terminal status written: `Completed` for a successful
    /// result, `Failed` otherwise.
    pub fn complete(
        &self,
        key: &str,
        result: CommandResult,
    ) -> Result<IdempotencyStatus, GuardError> {
        let mut record = self
            .records
            .get_mut(key)
            .ok_or_else(|| GuardError::UnknownKey(key.to_string()))?;

        if record.status.is_terminal() {
            return Err(GuardError::AlreadyTerminal {
                key: key.to_string(),
                status: record.status,
            });
        }

        let status = if result.success {
            IdempotencyStatus::Completed
        } else {
            IdempotencyStatus::Failed
        };
        record.status = status;
        record.result = Some(result);
        record.expires_at = Utc::now() + self.ttl;

        debug!(idempotency_key = key, status = %status, "Idempotency record settled");
        Ok(status)
    }

    pub fn record(&self, key: &str) -> Option<IdempotencyRecord> {
        self.records.get(key).map(|record| record.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop settled records whose TTL has elapsed; returns how many were removed.
    ///
    /// IN_PROGRESS records stay until their owner completes them.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_reclaimable_at(now));
        before.saturating_sub(self.records.len())
    }

    /// Purge every `interval` until `shutdown` carries `true` or its sender is dropped
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let guard = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = guard.purge_expired();
                        if purged > 0 {
                            info!(purged = purged, remaining = guard.len(), "🧹 Purged expired idempotency records");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Idempotency sweeper stopped");
        })
    }

    /// Settle a key the caller claimed but abandoned, ignoring already-settled keys
    pub(crate) fn settle_abandoned(&self, key: &str, result: CommandResult) {
        match self.complete(key, result) {
            Ok(_) | Err(GuardError::AlreadyTerminal { .. }) => {}
            Err(error) => warn!(idempotency_key = key, error = %error, "Could not settle abandoned key"),
        }
    }
}
