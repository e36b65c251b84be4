//! # Orchestration
//!
//! The command pipeline and the execution context that bounds it.
//!
//! ## Architecture
//!
//! [`CommandPipeline`] composes the lower layers without knowing their
//! internals:
//! - **IdempotencyGuard** claims the key and replays settled outcomes
//! - **CommandHandler** validates, checks invariants, prompts and plans
//! - **UnitOfWork** commits the plan's mutations all-or-nothing
//! - **RetryingGateway** absorbs transient backend failures underneath
//!
//! An [`ExecutionContext`] carries the cancellation signal and the command
//! deadline through every suspension point.

pub mod command_pipeline;
pub mod execution_context;

pub use command_pipeline::{CommandPipeline, PipelineOutcome};
pub use execution_context::{CancellationSignal, ExecutionContext, Interruption};
