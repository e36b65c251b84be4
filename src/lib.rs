#![allow(clippy::doc_markdown)] // Allow technical terms in docs without backticks
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Cmdgate Core
//!
//! Command-execution pipeline for user-triggered operations against an
//! unreliable remote backend.
//!
//! ## Overview
//!
//! Every command (account registration, banner insertion, password change,
//! tag insertion, address deletion, justification recording) is validated,
//! checked against business rules, optionally confirmed by the user, and then
//! committed at most once. A failed commit leaves the backend as it was
//! before the command started.
//!
//! ## Architecture
//!
//! Leaves first:
//!
//! - [`resilience::ConnectionMonitor`] - last known backend reachability
//! - [`resilience::RetryingGateway`] - bounded retry with exponential backoff
//! - [`idempotency::IdempotencyGuard`] - per-key deduplication and replay
//! - [`transaction::UnitOfWork`] - all-or-nothing commit with compensation
//! - [`orchestration::CommandPipeline`] - the state machine tying them together
//!
//! ## Module Organization
//!
//! - [`models`] - commands, results and stored records
//! - [`commands`] - one handler per command kind
//! - [`persistence`] - backend gateway trait and the in-memory implementation
//! - [`interfaces`] - presenter and authentication collaborators
//! - [`config`] - layered configuration
//! - [`error`] - the pipeline error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cmdgate_core::config::ConfigManager;
//! use cmdgate_core::interfaces::{StaticAuthProvider, TracingPresenter};
//! use cmdgate_core::models::{Command, CommandKind};
//! use cmdgate_core::orchestration::CommandPipeline;
//! use cmdgate_core::persistence::InMemoryGateway;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! cmdgate_core::logging::init_structured_logging();
//! let manager = ConfigManager::load()?;
//!
//! let backend = Arc::new(InMemoryGateway::new());
//! let pipeline = CommandPipeline::from_config(
//!     manager.config(),
//!     backend.clone(),
//!     backend,
//!     Arc::new(TracingPresenter::confirming()),
//!     Arc::new(StaticAuthProvider::new("operator-1")),
//! );
//!
//! let result = pipeline
//!     .submit(Command::from_json(
//!         CommandKind::RegisterAccount,
//!         "signup-ada-1",
//!         json!({ "username": "ada", "password": "analytical-engine", "email": "ada@example.com" }),
//!     ))
//!     .await;
//! println!("{}", result.message);
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod idempotency;
pub mod interfaces;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod persistence;
pub mod resilience;
pub mod state_machine;
pub mod transaction;
pub mod validation;

pub use config::{CmdgateConfig, ConfigManager, ConfigurationError};
pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use models::{Command, CommandKind, CommandResult};
pub use orchestration::{CancellationSignal, CommandPipeline, PipelineOutcome};
