//! # Command Pipeline
//!
//! Drives one command from submission to a settled outcome:
//!
//! ```text
//! RECEIVED -> VALIDATED -> [CONFIRMING] -> EXECUTING -> {COMMITTED, ROLLED_BACK}
//!     \____________\______________\______> REJECTED
//! ```
//!
//! The pipeline is the only component that decides a command's terminal state
//! and settles its idempotency key. Every path ends in exactly one presenter
//! call: `present_success` for a commit, `present_error` otherwise, and the
//! cached outcome for a replayed key.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cmdgate_core::config::CmdgateConfig;
//! use cmdgate_core::interfaces::{StaticAuthProvider, TracingPresenter};
//! use cmdgate_core::models::{Command, CommandKind};
//! use cmdgate_core::orchestration::CommandPipeline;
//! use cmdgate_core::persistence::InMemoryGateway;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let backend = Arc::new(InMemoryGateway::new());
//! let pipeline = CommandPipeline::from_config(
//!     &CmdgateConfig::default(),
//!     backend.clone(),
//!     backend,
//!     Arc::new(TracingPresenter::confirming()),
//!     Arc::new(StaticAuthProvider::new("operator-1")),
//! );
//!
//! let command = Command::from_json(CommandKind::InsertTag, "tag-beach-1", json!({ "name": "Beach" }));
//! let result = pipeline.submit(command).await;
//! assert!(result.success);
//! # }
//! ```

use super::execution_context::{CancellationSignal, ExecutionContext};
use crate::commands::{ExecutionPlan, HandlerRegistry};
use crate::config::CmdgateConfig;
use crate::constants::messages;
use crate::error::{ErrorKind, PipelineError, PipelineResult};
use crate::idempotency::{GuardDecision, IdempotencyGuard};
use crate::interfaces::{AuthenticationProvider, Presenter};
use crate::logging::{log_command_operation, log_error};
use crate::models::{Command, CommandResult};
use crate::persistence::PersistenceGateway;
use crate::resilience::{ConnectionMonitor, ReachabilityProbe, RetryingGateway};
use crate::state_machine::{CommandEvent, CommandState, CommandStateMachine, StateTransition};
use crate::transaction::UnitOfWork;
use crate::validation::validate_payload;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything observable about one submission
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub result: CommandResult,
    pub final_state: CommandState,

    /// The key was already settled and the cached result was returned
    pub replayed: bool,

    pub history: Vec<StateTransition>,
}

pub struct CommandPipeline {
    registry: Arc<HandlerRegistry>,
    guard: Arc<IdempotencyGuard>,
    gateway: Arc<RetryingGateway>,
    unit_of_work: UnitOfWork,
    presenter: Arc<dyn Presenter>,
    auth: Arc<dyn AuthenticationProvider>,
    command_timeout: Duration,
}

impl std::fmt::Debug for CommandPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPipeline")
            .field("kinds", &self.registry.kinds())
            .field("tracked_keys", &self.guard.len())
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl CommandPipeline {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        guard: Arc<IdempotencyGuard>,
        gateway: Arc<RetryingGateway>,
        presenter: Arc<dyn Presenter>,
        auth: Arc<dyn AuthenticationProvider>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            guard,
            unit_of_work: UnitOfWork::new(gateway.clone()),
            gateway,
            presenter,
            auth,
            command_timeout,
        }
    }

    /// Wire a pipeline with the default handlers from a loaded configuration
    pub fn from_config(
        config: &CmdgateConfig,
        backend: Arc<dyn PersistenceGateway>,
        probe: Arc<dyn ReachabilityProbe>,
        presenter: Arc<dyn Presenter>,
        auth: Arc<dyn AuthenticationProvider>,
    ) -> Self {
        let monitor = Arc::new(ConnectionMonitor::new(
            probe,
            config.connection.probe_timeout(),
        ));
        let gateway = Arc::new(RetryingGateway::new(
            backend,
            monitor,
            config.retry.policy(),
        ));

        Self::new(
            Arc::new(HandlerRegistry::with_defaults(&config.business)),
            Arc::new(IdempotencyGuard::new(config.idempotency.ttl())),
            gateway,
            presenter,
            auth,
            config.execution.command_timeout(),
        )
    }

    pub fn guard(&self) -> &Arc<IdempotencyGuard> {
        &self.guard
    }

    pub fn gateway(&self) -> &Arc<RetryingGateway> {
        &self.gateway
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Start the connection probe loop and the idempotency sweeper
    pub fn spawn_maintenance(
        &self,
        config: &CmdgateConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        info!(
            probe_interval_ms = config.connection.probe_interval_ms,
            sweep_interval_seconds = config.idempotency.sweep_interval_seconds,
            "⚙️ Starting pipeline maintenance tasks"
        );
        vec![
            self.gateway
                .monitor()
                .spawn_probe_loop(config.connection.probe_interval(), shutdown.clone()),
            self.guard
                .spawn_sweeper(config.idempotency.sweep_interval(), shutdown),
        ]
    }

    pub async fn submit(&self, command: Command) -> CommandResult {
        self.submit_with_cancellation(command, CancellationSignal::new())
            .await
            .result
    }

    /// Run `command` to a settled outcome, aborting early if `cancel` fires
    pub async fn submit_with_cancellation(
        &self,
        command: Command,
        cancel: CancellationSignal,
    ) -> PipelineOutcome {
        let key = command.idempotency_key().to_string();
        let command_id = command.id().to_string();
        let kind = command.kind().to_string();
        let mut machine = CommandStateMachine::new(command_id.as_str());

        match self.guard.begin(&key) {
            GuardDecision::Completed(cached) => {
                advance(&mut machine, CommandEvent::Replay { success: cached.success });
                log_command_operation("replay", &command_id, &key, &kind, "replayed", None);
                self.present(&cached).await;
                return outcome(cached, &machine, true);
            }
            GuardDecision::InProgress => {
                let error = PipelineError::DuplicateRequest { key: key.clone() };
                warn!(command_id = %command_id, idempotency_key = %key, "🔄 Duplicate submission while in progress");
                advance(&mut machine, CommandEvent::Reject(error.kind()));
                let result = CommandResult::from_error(&error);
                log_command_operation("submit", &command_id, &key, &kind, "duplicate", None);
                self.present(&result).await;
                return outcome(result, &machine, false);
            }
            GuardDecision::Fresh => {}
        }

        let mut claim = InFlightKey::new(&self.guard, &key);
        let context = ExecutionContext::new(cancel, self.command_timeout);

        let result = match self.run(command, &context, &mut machine).await {
            Ok(result) => result,
            Err(error) => {
                if machine.current_state().is_executing() {
                    advance(&mut machine, CommandEvent::RollBack(error.to_string()));
                } else {
                    advance(&mut machine, CommandEvent::Reject(error.kind()));
                }
                debug!(
                    command_id = %command_id,
                    idempotency_key = %key,
                    error = %error,
                    "Command did not commit"
                );
                CommandResult::from_error(&error)
            }
        };

        if let Err(error) = self.guard.complete(&key, result.clone()) {
            log_error(
                "command_pipeline",
                "complete",
                &error.to_string(),
                Some(&key),
            );
        }
        claim.release();

        let state = machine.current_state();
        log_command_operation(
            "submit",
            &command_id,
            &key,
            &kind,
            &state.to_string(),
            result.error_kind.map(|kind| kind.to_string()).as_deref(),
        );
        self.present(&result).await;
        outcome(result, &machine, false)
    }

    async fn run(
        &self,
        command: Command,
        context: &ExecutionContext,
        machine: &mut CommandStateMachine,
    ) -> PipelineResult<CommandResult> {
        let requester = self
            .auth
            .current_user()
            .await
            .ok_or_else(|| PipelineError::invalid_input(messages::NOT_AUTHENTICATED))?;
        let command = command.stamped(requester);

        let handler = self.registry.get(command.kind()).ok_or_else(|| {
            PipelineError::invalid_input(format!("Unsupported command: {}", command.kind()))
        })?;

        validate_payload(command.payload())?;
        handler.validate(&command)?;
        advance(machine, CommandEvent::Validate);

        context
            .guarded(handler.check_invariants(&command, &self.gateway))
            .await?;

        if let Some(prompt) = handler.confirmation_prompt(&command) {
            advance(machine, CommandEvent::RequestConfirmation);
            let confirmed = context
                .guarded(async { Ok(self.presenter.request_confirmation(&prompt).await) })
                .await?;
            if !confirmed {
                return Err(PipelineError::UserCancelled(format!(
                    "{} declined by {}",
                    command.kind(),
                    command.requester_id()
                )));
            }
        }

        let ExecutionPlan {
            mutations,
            produced_id,
            success_message,
        } = context
            .guarded(handler.plan(&command, &self.gateway))
            .await?;

        if let Some(interruption) = context.check() {
            return Err(context.error_for(interruption));
        }
        advance(machine, CommandEvent::Execute);
        debug!(
            command_id = %command.id(),
            mutations = mutations.len(),
            remaining_ms = context.remaining().as_millis() as u64,
            "Executing command"
        );

        let mut scope = self.unit_of_work.scope();
        for mutation in mutations {
            scope.register(mutation)?;
        }

        let interrupted = tokio::select! {
            biased;
            interruption = context.interrupted() => Some(interruption),
            committed = scope.commit() => {
                committed?;
                None
            }
        };

        if let Some(interruption) = interrupted {
            warn!(
                command_id = %command.id(),
                transaction_id = %scope.context().transaction_id(),
                interruption = ?interruption,
                "🔄 Execution interrupted, rolling back"
            );
            if let Err(error) = scope.rollback().await {
                log_error(
                    "command_pipeline",
                    "rollback",
                    &error.to_string(),
                    Some(command.idempotency_key()),
                );
            }
            return Err(context.error_for(interruption));
        }

        advance(machine, CommandEvent::Commit);
        Ok(CommandResult::success(success_message, produced_id))
    }

    async fn present(&self, result: &CommandResult) {
        if result.success {
            self.presenter.present_success(result).await;
        } else {
            let kind = result.error_kind.unwrap_or(ErrorKind::PersistenceError);
            self.presenter.present_error(kind, &result.message).await;
        }
    }
}

fn advance(machine: &mut CommandStateMachine, event: CommandEvent) {
    let event_type = event.event_type();
    if let Err(error) = machine.transition(event) {
        log_error(
            "command_pipeline",
            event_type,
            &error.to_string(),
            Some(machine.command_id()),
        );
    }
}

fn outcome(result: CommandResult, machine: &CommandStateMachine, replayed: bool) -> PipelineOutcome {
    PipelineOutcome {
        result,
        final_state: machine.current_state(),
        replayed,
        history: machine.history().to_vec(),
    }
}

/// Settles a claimed key as cancelled if the submitting future is dropped
/// before the pipeline records an outcome.
struct InFlightKey<'a> {
    guard: &'a IdempotencyGuard,
    key: &'a str,
    armed: bool,
}

impl<'a> InFlightKey<'a> {
    fn new(guard: &'a IdempotencyGuard, key: &'a str) -> Self {
        Self {
            guard,
            key,
            armed: true,
        }
    }

    fn release(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightKey<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(idempotency_key = self.key, "Submission dropped before settling, marking cancelled");
            self.guard
                .settle_abandoned(self.key, CommandResult::from_error(&PipelineError::Cancelled));
        }
    }
}
