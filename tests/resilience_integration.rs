//! Backend failure handling as seen through the pipeline

mod common;

use cmdgate_core::error::ErrorKind;
use cmdgate_core::idempotency::IdempotencyStatus;
use cmdgate_core::orchestration::CancellationSignal;
use cmdgate_core::persistence::{BackendError, GatewayOperation};
use cmdgate_core::state_machine::CommandState;
use common::*;
use futures::future::join_all;
use std::time::Duration;

#[tokio::test]
async fn test_unreachable_backend_fails_fast() {
    let h = TestHarness::new();
    h.backend.set_reachable(false);
    assert!(!h.monitor().probe().await);

    let key = unique_key("tag");
    let outcome = h
        .pipeline
        .submit_with_cancellation(insert_tag(&key, "Beach"), CancellationSignal::new())
        .await;

    assert!(outcome.result.is_failure_of(ErrorKind::ConnectionInterrupted));
    assert!(outcome.result.retryable);
    assert_eq!(outcome.final_state, CommandState::Rejected);
    assert_eq!(h.faults.calls(GatewayOperation::FindAll), 0);

    // The key stays terminal; a fresh key succeeds once the backend is back
    h.backend.set_reachable(true);
    assert!(h.monitor().probe().await);

    let replay = h.pipeline.submit(insert_tag(&key, "Beach")).await;
    assert!(replay.is_failure_of(ErrorKind::ConnectionInterrupted));

    let retry = h.pipeline.submit(insert_tag(&unique_key("tag"), "Beach")).await;
    assert!(retry.success);
    assert_eq!(h.backend.records("tags").len(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_roll_back_and_stay_retryable() {
    let h = TestHarness::new();
    h.faults
        .fail_always(GatewayOperation::Save, BackendError::transient("connection reset"));
    let key = unique_key("signup");

    let outcome = h
        .pipeline
        .submit_with_cancellation(register_account(&key, "linus"), CancellationSignal::new())
        .await;

    assert!(outcome.result.is_failure_of(ErrorKind::RetriesExhausted));
    assert!(outcome.result.retryable);
    assert_eq!(outcome.final_state, CommandState::RolledBack);
    assert_eq!(h.faults.calls(GatewayOperation::Save), 3);
    assert!(h.backend.records("accounts").is_empty());
    assert_eq!(
        h.pipeline.guard().record(&key).unwrap().status,
        IdempotencyStatus::Failed
    );
    assert_eq!(h.presenter.errors_of(ErrorKind::RetriesExhausted), 1);
}

#[tokio::test]
async fn test_backend_lost_after_confirmation_rolls_back_retryable() {
    let h = TestHarness::new();
    Seeder::new(&h.backend).rest_point("rp-1", 3, 0);
    let before = h.backend.snapshot();
    let backend = h.backend.clone();
    h.presenter.on_confirmation(move || {
        let backend = backend.clone();
        async move { backend.set_reachable(false) }
    });
    let key = unique_key("banner");

    let outcome = h
        .pipeline
        .submit_with_cancellation(insert_banner(&key, "rp-1"), CancellationSignal::new())
        .await;

    assert!(outcome.result.is_failure_of(ErrorKind::RetriesExhausted), "{outcome:?}");
    assert!(outcome.result.retryable);
    assert_eq!(outcome.final_state, CommandState::RolledBack);
    assert_eq!(h.backend.snapshot(), before);
    assert_eq!(h.presenter.errors_of(ErrorKind::RetriesExhausted), 1);
    assert_eq!(
        h.pipeline.guard().record(&key).unwrap().status,
        IdempotencyStatus::Failed
    );
}

#[tokio::test]
async fn test_monitor_down_after_confirmation_fails_fast_and_rolls_back() {
    let h = TestHarness::new();
    Seeder::new(&h.backend).rest_point("rp-1", 3, 0);
    let before = h.backend.snapshot();
    let backend = h.backend.clone();
    let monitor = h.monitor().clone();
    h.presenter.on_confirmation(move || {
        let backend = backend.clone();
        let monitor = monitor.clone();
        async move {
            backend.set_reachable(false);
            assert!(!monitor.probe().await);
        }
    });

    let outcome = h
        .pipeline
        .submit_with_cancellation(
            insert_banner(&unique_key("banner"), "rp-1"),
            CancellationSignal::new(),
        )
        .await;

    assert!(outcome.result.is_failure_of(ErrorKind::ConnectionInterrupted), "{outcome:?}");
    assert!(outcome.result.retryable);
    assert_eq!(outcome.final_state, CommandState::RolledBack);
    assert_eq!(h.backend.snapshot(), before);
    assert_eq!(h.faults.calls(GatewayOperation::Save), 0);
    assert_eq!(h.presenter.errors_of(ErrorKind::ConnectionInterrupted), 1);
}

#[tokio::test]
async fn test_fatal_error_is_not_retried() {
    let h = TestHarness::new();
    h.faults
        .fail_next(GatewayOperation::Save, 1, BackendError::fatal("constraint violated"));

    let result = h.pipeline.submit(insert_tag(&unique_key("tag"), "Museum")).await;

    assert!(result.is_failure_of(ErrorKind::PersistenceError));
    assert!(!result.retryable);
    assert_eq!(result.message, "The operation could not be saved.");
    assert_eq!(h.faults.calls(GatewayOperation::Save), 1);
    assert!(h.backend.records("tags").is_empty());
}

#[tokio::test]
async fn test_transient_read_during_invariant_check_is_absorbed() {
    let h = TestHarness::new();
    Seeder::new(&h.backend).rest_point("rp-1", 3, 0);
    h.faults
        .fail_next(GatewayOperation::Count, 2, BackendError::transient("timeout"));

    let result = h.pipeline.submit(insert_banner(&unique_key("banner"), "rp-1")).await;

    assert!(result.success, "{result:?}");
    assert_eq!(h.faults.calls(GatewayOperation::Count), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_key_executes_once() {
    let h = TestHarness::new();
    h.backend.set_latency(Some(Duration::from_millis(5)));
    let key = unique_key("race");

    let submissions = (0..8).map(|_| {
        let pipeline = h.pipeline.clone();
        let command = insert_tag(&key, "Harbour");
        tokio::spawn(async move {
            pipeline
                .submit_with_cancellation(command, CancellationSignal::new())
                .await
        })
    });
    let outcomes: Vec<_> = join_all(submissions)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let executed = outcomes
        .iter()
        .filter(|o| !o.replayed && o.result.success)
        .count();
    assert_eq!(executed, 1);

    for outcome in outcomes.iter().filter(|o| !(o.result.success && !o.replayed)) {
        assert!(
            outcome.replayed || outcome.result.is_failure_of(ErrorKind::DuplicateRequest),
            "unexpected outcome {outcome:?}"
        );
    }
    assert_eq!(h.backend.records("tags").len(), 1);
    assert_eq!(h.backend.writes(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_run_independently() {
    let h = TestHarness::new();
    h.backend.set_latency(Some(Duration::from_millis(5)));

    let names = ["Beach", "Museum", "Harbour", "Old Town", "Market"];
    let submissions = names.iter().map(|name| {
        let pipeline = h.pipeline.clone();
        let command = insert_tag(&unique_key("tag"), name);
        async move { pipeline.submit(command).await }
    });
    let results = join_all(submissions).await;

    assert!(results.iter().all(|r| r.success));
    assert_eq!(h.backend.records("tags").len(), names.len());
    assert_eq!(h.pipeline.guard().len(), names.len());
}
