//! # Execution Context
//!
//! One cancellable, deadline-bound context wraps a whole command execution.
//! A user abandoning the command and the backend taking too long share the
//! same mechanism: every suspension point in the pipeline races its work
//! against [`ExecutionContext::interrupted`].

use crate::error::{PipelineError, PipelineResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cloneable handle used to cancel an in-flight command from outside
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            // The sender lives in `self`, so `changed` only fails if it is dropped mid-wait
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Why an execution stopped before finishing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    cancel: CancellationSignal,
    deadline: Instant,
    timeout: Duration,
}

impl ExecutionContext {
    pub fn new(cancel: CancellationSignal, timeout: Duration) -> Self {
        Self {
            cancel,
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Non-blocking check, cancellation taking precedence over the deadline
    pub fn check(&self) -> Option<Interruption> {
        if self.cancel.is_cancelled() {
            Some(Interruption::Cancelled)
        } else if Instant::now() >= self.deadline {
            Some(Interruption::TimedOut)
        } else {
            None
        }
    }

    /// Resolve at the first cancellation or when the deadline passes
    pub async fn interrupted(&self) -> Interruption {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Interruption::Cancelled,
            _ = tokio::time::sleep_until(self.deadline) => Interruption::TimedOut,
        }
    }

    pub fn error_for(&self, interruption: Interruption) -> PipelineError {
        match interruption {
            Interruption::Cancelled => PipelineError::Cancelled,
            Interruption::TimedOut => PipelineError::TimedOut(self.timeout),
        }
    }

    /// Run `work` unless the context is interrupted first
    pub async fn guarded<T, F>(&self, work: F) -> PipelineResult<T>
    where
        F: Future<Output = PipelineResult<T>>,
    {
        tokio::select! {
            biased;
            interruption = self.interrupted() => Err(self.error_for(interruption)),
            result = work => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_slow_work() {
        let context = ExecutionContext::new(CancellationSignal::new(), Duration::from_millis(50));
        let result: PipelineResult<()> = context
            .guarded(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(PipelineError::TimedOut(Duration::from_millis(50))));
        assert_eq!(context.check(), Some(Interruption::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_wins_over_work() {
        let cancel = CancellationSignal::new();
        let context = ExecutionContext::new(cancel.clone(), Duration::from_secs(60));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result: PipelineResult<()> = context
            .guarded(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(PipelineError::Cancelled));
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_fast_work_completes() {
        let context = ExecutionContext::new(CancellationSignal::new(), Duration::from_secs(5));
        assert_eq!(context.guarded(async { Ok(7) }).await, Ok(7));
        assert_eq!(context.check(), None);
        assert!(context.remaining() <= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let cancel = CancellationSignal::new();
        cancel.cancel();
        let context = ExecutionContext::new(cancel, Duration::from_secs(5));
        assert_eq!(context.interrupted().await, Interruption::Cancelled);
    }
}
