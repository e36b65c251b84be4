//! # Retry Policy
//!
//! Capped exponential backoff. The delay before retry `n` (1-based, counting
//! failed attempts) is `min(base_delay * 2^(n-1), max_delay)`. Optional jitter
//! stretches a delay by up to 10% and is capped at `max_delay` again.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on the proportional jitter applied to a delay
pub const JITTER_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one; at least 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(2000),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            jitter: false,
        }
    }

    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Deterministic backoff before retrying after failed attempt `attempt`
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Backoff including jitter when enabled; never above `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for_attempt(attempt);
        let jittered = if self.jitter {
            delay.mul_f64(1.0 + fastrand::f64() * JITTER_FACTOR)
        } else {
            delay
        };
        jittered.min(self.max_delay)
    }

    /// Sum of the deterministic delays across the first `failures` retries
    pub fn total_backoff(&self, failures: u32) -> Duration {
        (1..=failures)
            .map(|attempt| self.base_delay_for_attempt(attempt))
            .fold(Duration::ZERO, |total, delay| total.saturating_add(delay))
    }
}
