//! # Idempotency
//!
//! Deduplicates submissions by caller-supplied key. Each key owns exactly one
//! [`IdempotencyRecord`]; duplicates either wait out an in-flight submission
//! (rejected as duplicates) or replay its cached [`CommandResult`](crate::models::CommandResult).

pub mod guard;
pub mod record;

pub use guard::{GuardError, IdempotencyGuard};
pub use record::{GuardDecision, IdempotencyRecord, IdempotencyStatus};
