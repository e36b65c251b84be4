//! # Unit of Work
//!
//! Commits a command's mutations all-or-nothing. Mutations are written in
//! registration order through the [`RetryingGateway`]; when one fails, the
//! mutations already written are compensated in reverse order before the
//! context becomes `RolledBack`. The failed write itself is not compensated.
//!
//! An explicit [`UnitOfWork::rollback`] after an interrupted commit also
//! compensates the mutation that was in flight, since its outcome is unknown.
//!
//! A context moves from `Open` to exactly one terminal state and never reopens.

use super::context::{TransactionContext, TransactionState};
use super::errors::TransactionError;
use super::mutation::Mutation;
use crate::logging::log_transaction_operation;
use crate::resilience::RetryingGateway;
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct UnitOfWork {
    gateway: Arc<RetryingGateway>,
}

impl UnitOfWork {
    pub fn new(gateway: Arc<RetryingGateway>) -> Self {
        Self { gateway }
    }

    pub fn open(&self) -> TransactionContext {
        let context = TransactionContext::new();
        debug!(transaction_id = %context.transaction_id(), "Transaction opened");
        context
    }

    /// Open a context that rolls itself back if dropped while holding effects
    pub fn scope(&self) -> TransactionScope {
        TransactionScope {
            unit_of_work: self.clone(),
            context: self.open(),
        }
    }

    pub fn register_mutation(
        &self,
        context: &mut TransactionContext,
        mutation: Mutation,
    ) -> Result<(), TransactionError> {
        ensure_open(context)?;
        debug!(
            transaction_id = %context.transaction_id(),
            target = %mutation.target,
            operation = %mutation.operation,
            "Mutation registered"
        );
        context.mutations.push(mutation);
        Ok(())
    }

    /// Persist every registered mutation or none of them.
    ///
    /// Resumable: progress is tracked on the context, so a commit future
    /// dropped mid-write leaves enough state for [`rollback`](Self::rollback)
    /// to undo the partial effects.
    pub async fn commit(&self, context: &mut TransactionContext) -> Result<(), TransactionError> {
        ensure_open(context)?;

        while context.applied < context.mutations.len() {
            let index = context.applied;
            context.in_flight = true;
            let result = context.mutations[index].apply(&self.gateway).await;

            if let Err(source) = result {
                let target = context.mutations[index].target.clone();
                warn!(
                    transaction_id = %context.transaction_id(),
                    index = index,
                    target = %target,
                    operation = %source.operation(),
                    error = %source,
                    "❌ Mutation failed, compensating"
                );
                context.in_flight = false;
                let compensation_failure = self
                    .compensate_and_close(context)
                    .await
                    .err()
                    .map(|error| error.to_string());
                return Err(TransactionError::MutationFailed {
                    transaction_id: context.transaction_id(),
                    index,
                    target,
                    source,
                    compensation_failure,
                });
            }

            context.applied += 1;
            context.in_flight = false;
        }

        context.state = TransactionState::Committed;
        log_transaction_operation(
            "commit",
            context.transaction_id(),
            context.mutations.len(),
            "committed",
            None,
        );
        Ok(())
    }

    /// Discard the context, undoing anything already written
    pub async fn rollback(&self, context: &mut TransactionContext) -> Result<(), TransactionError> {
        ensure_open(context)?;
        self.compensate_and_close(context).await
    }

    async fn compensate_and_close(
        &self,
        context: &mut TransactionContext,
    ) -> Result<(), TransactionError> {
        let effects = context.pending_effects();
        let mut failures = Vec::new();

        for index in (0..effects).rev() {
            let mutation = &context.mutations[index];
            if let Err(error) = mutation.compensate(&self.gateway).await {
                error!(
                    transaction_id = %context.transaction_id(),
                    index = index,
                    target = %mutation.target,
                    error = %error,
                    "❌ Compensation failed"
                );
                failures.push(format!("{}: {error}", mutation.target));
            }
        }

        let discarded = context.mutations.len();
        context.mutations.clear();
        context.applied = 0;
        context.in_flight = false;
        context.state = TransactionState::RolledBack;

        let details = format!("compensated {effects} of {discarded}");
        log_transaction_operation(
            "rollback",
            context.transaction_id(),
            discarded,
            if failures.is_empty() {
                "rolled_back"
            } else {
                "compensation_failed"
            },
            Some(&details),
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TransactionError::CompensationFailed {
                transaction_id: context.transaction_id(),
                reason: failures.join("; "),
            })
        }
    }
}

fn ensure_open(context: &TransactionContext) -> Result<(), TransactionError> {
    if context.state() == TransactionState::Open {
        Ok(())
    } else {
        Err(TransactionError::InvalidTransactionState {
            transaction_id: context.transaction_id(),
            state: context.state(),
        })
    }
}

/// Owned transaction context bound to its unit of work.
///
/// If the scope is dropped while still open with effects on the backend (the
/// owning task was aborted mid-commit), a detached rollback is spawned on the
/// current runtime.
#[derive(Debug)]
pub struct TransactionScope {
    unit_of_work: UnitOfWork,
    context: TransactionContext,
}

impl TransactionScope {
    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    pub fn register(&mut self, mutation: Mutation) -> Result<(), TransactionError> {
        self.unit_of_work
            .register_mutation(&mut self.context, mutation)
    }

    pub async fn commit(&mut self) -> Result<(), TransactionError> {
        self.unit_of_work.commit(&mut self.context).await
    }

    pub async fn rollback(&mut self) -> Result<(), TransactionError> {
        self.unit_of_work.rollback(&mut self.context).await
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.context.state() != TransactionState::Open || self.context.pending_effects() == 0 {
            return;
        }

        let mut context = std::mem::take(&mut self.context);
        let unit_of_work = self.unit_of_work.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(
                    transaction_id = %context.transaction_id(),
                    "Transaction abandoned while open, rolling back in background"
                );
                handle.spawn(async move {
                    if let Err(error) = unit_of_work.rollback(&mut context).await {
                        error!(error = %error, "❌ Background rollback failed");
                    }
                });
            }
            Err(_) => {
                error!(
                    transaction_id = %context.transaction_id(),
                    "Transaction abandoned outside a runtime, effects not compensated"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, RecordKey};
    use crate::persistence::{BackendError, GatewayOperation, InMemoryGateway, ScriptedFaults};
    use crate::resilience::{ConnectionMonitor, GatewayError, RetryPolicy};
    use serde_json::json;
    use std::time::Duration;

    fn setup(faults: Arc<ScriptedFaults>) -> (Arc<InMemoryGateway>, UnitOfWork) {
        let backend = Arc::new(InMemoryGateway::with_faults(faults));
        let monitor = Arc::new(ConnectionMonitor::new(backend.clone(), Duration::from_millis(100)));
        let gateway = RetryingGateway::new(
            backend.clone(),
            monitor,
            RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2)),
        );
        (backend, UnitOfWork::new(Arc::new(gateway)))
    }

    fn key(id: &str) -> RecordKey {
        RecordKey::new("absences", id)
    }

    #[tokio::test]
    async fn test_commit_applies_in_order() {
        let (backend, uow) = setup(Arc::new(ScriptedFaults::new()));
        backend.seed(Record::new(key("a1"), json!({ "justified": false })));
        backend.seed(Record::new(key("a2"), json!({ "justified": false })));

        let mut ctx = uow.open();
        uow.register_mutation(&mut ctx, Mutation::create(key("a3"), json!({ "justified": false })))
            .unwrap();
        uow.register_mutation(
            &mut ctx,
            Mutation::update(key("a1"), json!({ "justified": false }), json!({ "justified": true })),
        )
        .unwrap();
        uow.register_mutation(&mut ctx, Mutation::delete(key("a2"), json!({ "justified": false })))
            .unwrap();

        uow.commit(&mut ctx).await.unwrap();
        assert_eq!(ctx.state(), TransactionState::Committed);
        assert_eq!(backend.get(&key("a1")).unwrap().data, json!({ "justified": true }));
        assert!(backend.get(&key("a2")).is_none());
        assert!(backend.get(&key("a3")).is_some());
    }

    #[tokio::test]
    async fn test_failed_commit_restores_previous_state() {
        let faults = Arc::new(ScriptedFaults::new());
        let (backend, uow) = setup(faults.clone());
        backend.seed(Record::new(key("a1"), json!({ "justified": false })));
        let before = backend.snapshot();

        let mut ctx = uow.open();
        uow.register_mutation(&mut ctx, Mutation::create(key("a2"), json!({})))
            .unwrap();
        uow.register_mutation(
            &mut ctx,
            Mutation::update(key("a1"), json!({ "justified": false }), json!({ "justified": true })),
        )
        .unwrap();
        uow.register_mutation(&mut ctx, Mutation::delete(key("a1"), json!({ "justified": true })))
            .unwrap();
        faults.fail_next(GatewayOperation::Delete, 1, BackendError::fatal("locked"));

        let err = uow.commit(&mut ctx).await.unwrap_err();
        assert!(matches!(err, TransactionError::MutationFailed { index: 2, .. }));
        assert_eq!(ctx.state(), TransactionState::RolledBack);
        assert!(ctx.mutations().is_empty());
        assert_eq!(backend.snapshot(), before);
    }

    #[tokio::test]
    async fn test_terminal_context_never_reopens() {
        let (_, uow) = setup(Arc::new(ScriptedFaults::new()));
        let mut ctx = uow.open();
        uow.commit(&mut ctx).await.unwrap();

        assert!(matches!(
            uow.register_mutation(&mut ctx, Mutation::create(key("x"), json!({}))),
            Err(TransactionError::InvalidTransactionState { .. })
        ));
        assert!(uow.rollback(&mut ctx).await.is_err());
        assert!(uow.commit(&mut ctx).await.is_err());
        assert_eq!(ctx.state(), TransactionState::Committed);
    }

    #[tokio::test]
    async fn test_failed_write_is_not_compensated() {
        let faults = Arc::new(ScriptedFaults::new());
        let (backend, uow) = setup(faults.clone());

        let mut ctx = uow.open();
        uow.register_mutation(&mut ctx, Mutation::create(key("a1"), json!({})))
            .unwrap();
        faults.fail_next(GatewayOperation::Save, 1, BackendError::fatal("full"));
        faults.fail_always(GatewayOperation::Delete, BackendError::fatal("locked"));

        let err = uow.commit(&mut ctx).await.unwrap_err();
        assert!(matches!(
            err,
            TransactionError::MutationFailed {
                index: 0,
                compensation_failure: None,
                ..
            }
        ));
        assert_eq!(faults.calls(GatewayOperation::Delete), 0);
        assert_eq!(ctx.state(), TransactionState::RolledBack);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_compensation_failure_keeps_mutation_error() {
        let faults = Arc::new(ScriptedFaults::new());
        let (backend, uow) = setup(faults.clone());

        let mut ctx = uow.open();
        uow.register_mutation(&mut ctx, Mutation::create(key("a1"), json!({})))
            .unwrap();
        uow.register_mutation(
            &mut ctx,
            Mutation::create(RecordKey::new("justifications", "j1"), json!({})),
        )
        .unwrap();
        faults.fail_next_in(GatewayOperation::Save, "justifications", 1, BackendError::fatal("full"));
        faults.fail_always(GatewayOperation::Delete, BackendError::fatal("locked"));

        let err = uow.commit(&mut ctx).await.unwrap_err();
        match err {
            TransactionError::MutationFailed {
                index,
                source,
                compensation_failure,
                ..
            } => {
                assert_eq!(index, 1);
                assert!(matches!(source, GatewayError::Persistence { .. }));
                assert!(compensation_failure.is_some());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(ctx.state(), TransactionState::RolledBack);
        assert!(backend.get(&key("a1")).is_some());
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_commit_with_connection_error() {
        let (backend, uow) = setup(Arc::new(ScriptedFaults::new()));
        backend.seed(Record::new(key("a1"), json!({ "justified": false })));
        let before = backend.snapshot();

        let mut ctx = uow.open();
        uow.register_mutation(&mut ctx, Mutation::create(key("a2"), json!({})))
            .unwrap();
        uow.register_mutation(
            &mut ctx,
            Mutation::update(key("a1"), json!({ "justified": false }), json!({ "justified": true })),
        )
        .unwrap();
        backend.set_reachable(false);

        let err = uow.commit(&mut ctx).await.unwrap_err();
        assert!(matches!(
            err,
            TransactionError::MutationFailed {
                index: 0,
                source: GatewayError::RetriesExhausted { .. },
                compensation_failure: None,
                ..
            }
        ));
        assert_eq!(ctx.state(), TransactionState::RolledBack);
        assert_eq!(backend.snapshot(), before);
    }

    #[tokio::test]
    async fn test_rollback_reports_compensation_failure() {
        let faults = Arc::new(ScriptedFaults::new());
        let (backend, uow) = setup(faults.clone());
        backend.set_latency(Some(Duration::from_millis(50)));

        let mut scope = uow.scope();
        scope.register(Mutation::create(key("a1"), json!({}))).unwrap();
        scope.register(Mutation::create(key("a2"), json!({}))).unwrap();
        let interrupted = tokio::time::timeout(Duration::from_millis(75), scope.commit()).await;
        assert!(interrupted.is_err());

        faults.fail_always(GatewayOperation::Delete, BackendError::fatal("locked"));
        let err = scope.rollback().await.unwrap_err();
        assert!(matches!(err, TransactionError::CompensationFailed { .. }));
        assert_eq!(scope.context().state(), TransactionState::RolledBack);
    }

    #[tokio::test]
    async fn test_rollback_compensates_in_flight_mutation() {
        let (backend, uow) = setup(Arc::new(ScriptedFaults::new()));
        backend.set_latency(Some(Duration::from_millis(50)));
        let before = backend.snapshot();

        let mut scope = uow.scope();
        scope.register(Mutation::create(key("a1"), json!({}))).unwrap();
        scope.register(Mutation::create(key("a2"), json!({}))).unwrap();

        let interrupted = tokio::time::timeout(Duration::from_millis(75), scope.commit()).await;
        assert!(interrupted.is_err());

        scope.rollback().await.unwrap();
        assert_eq!(scope.context().state(), TransactionState::RolledBack);
        assert_eq!(backend.snapshot(), before);
    }
}
