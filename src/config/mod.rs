//! # Cmdgate Configuration System
//!
//! Typed, validated configuration for the command pipeline.
//!
//! ## Architecture
//!
//! - **Layered Sources**: built-in defaults, `config/cmdgate.toml`,
//!   `config/cmdgate.<env>.toml`, then `CMDGATE__SECTION__KEY` variables
//! - **Environment Awareness**: `CMDGATE_ENV` or `APP_ENV` selects the override file
//! - **Explicit Validation**: inconsistent settings fail at load time
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cmdgate_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let policy = manager.config().retry.policy();
//! let ttl = manager.config().idempotency.ttl();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring config/cmdgate.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CmdgateConfig {
    /// Backoff settings for backend calls
    pub retry: RetryConfig,

    /// Idempotency record lifetime
    pub idempotency: IdempotencyConfig,

    /// Pipeline deadline
    pub execution: ExecutionConfig,

    /// Reachability probing
    pub connection: ConnectionConfig,

    /// Limits enforced by command handlers
    pub business: BusinessConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            jitter_enabled: true,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
        .with_jitter(self.jitter_enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    pub ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 600,
            sweep_interval_seconds: 60,
        }
    }
}

impl IdempotencyConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Deadline covering validation, confirmation and commit of one command
    pub command_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 30_000,
        }
    }
}

impl ExecutionConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub probe_interval_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 5000,
            probe_timeout_ms: 1000,
        }
    }
}

impl ConnectionConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BusinessConfig {
    /// Applies to rest points that do not carry their own `maxBanners`
    pub max_banners_per_rest_point: usize,
    pub max_image_bytes: usize,
    pub allowed_image_types: Vec<String>,
    pub min_password_length: usize,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            max_banners_per_rest_point: 5,
            max_image_bytes: 5 * 1024 * 1024,
            allowed_image_types: ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            min_password_length: 8,
        }
    }
}

impl CmdgateConfig {
    /// Validate configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "retry.max_attempts",
                "0",
                "at least one attempt is required",
            ));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigurationError::validation_error(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }

        let positive = [
            ("idempotency.ttl_seconds", self.idempotency.ttl_seconds),
            (
                "idempotency.sweep_interval_seconds",
                self.idempotency.sweep_interval_seconds,
            ),
            ("execution.command_timeout_ms", self.execution.command_timeout_ms),
            ("connection.probe_interval_ms", self.connection.probe_interval_ms),
            ("connection.probe_timeout_ms", self.connection.probe_timeout_ms),
            (
                "business.max_banners_per_rest_point",
                self.business.max_banners_per_rest_point as u64,
            ),
            ("business.max_image_bytes", self.business.max_image_bytes as u64),
            (
                "business.min_password_length",
                self.business.min_password_length as u64,
            ),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "must be greater than 0",
                ));
            }
        }

        // Expired IN_PROGRESS records are reclaimed, so no command may outlive its record
        if self.execution.command_timeout() >= self.idempotency.ttl() {
            return Err(ConfigurationError::validation_error(format!(
                "execution.command_timeout_ms ({}) must be shorter than idempotency.ttl_seconds ({}s)",
                self.execution.command_timeout_ms, self.idempotency.ttl_seconds
            )));
        }

        if self.business.allowed_image_types.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "business.allowed_image_types",
                "at least one image type must be allowed",
            ));
        }

        Ok(())
    }
}
