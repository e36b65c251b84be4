//! # Resilience Module
//!
//! Connection awareness and retry for backend access.
//!
//! ## Architecture
//!
//! - **Connection Monitor**: last known reachability, refreshed by probes
//! - **Retry Policy**: capped exponential backoff with optional jitter
//! - **Retrying Gateway**: applies the policy to every backend call and fails
//!   fast while the monitor reports the backend unreachable
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cmdgate_core::persistence::InMemoryGateway;
//! use cmdgate_core::resilience::{ConnectionMonitor, RetryPolicy, RetryingGateway};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(InMemoryGateway::new());
//! let monitor = Arc::new(ConnectionMonitor::new(backend.clone(), Duration::from_secs(1)));
//! let gateway = RetryingGateway::new(backend, monitor, RetryPolicy::default());
//!
//! let tags = gateway.find_all("tags").await?;
//! # Ok(())
//! # }
//! ```

pub mod connection_monitor;
pub mod retry;
pub mod retrying_gateway;

pub use connection_monitor::{AlwaysReachable, ConnectionMonitor, ConnectionState, ReachabilityProbe};
pub use retry::RetryPolicy;
pub use retrying_gateway::{GatewayError, GatewayResult, RetryingGateway};
