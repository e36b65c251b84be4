//! Shared fixtures for the pipeline integration tests

#![allow(dead_code)]

pub mod builders;
pub mod presenter;

pub use builders::*;
pub use presenter::*;

use cmdgate_core::commands::HandlerRegistry;
use cmdgate_core::config::BusinessConfig;
use cmdgate_core::idempotency::IdempotencyGuard;
use cmdgate_core::interfaces::{Presenter, StaticAuthProvider};
use cmdgate_core::orchestration::CommandPipeline;
use cmdgate_core::persistence::{InMemoryGateway, ScriptedFaults};
use cmdgate_core::resilience::{ConnectionMonitor, RetryPolicy, RetryingGateway};
use std::sync::Arc;
use std::time::Duration;

pub const OPERATOR: &str = "operator-1";

/// Fully wired pipeline over an in-memory backend with scripted faults
pub struct TestHarness {
    pub backend: Arc<InMemoryGateway>,
    pub faults: Arc<ScriptedFaults>,
    pub presenter: Arc<RecordingPresenter>,
    pub auth: Arc<StaticAuthProvider>,
    pub pipeline: Arc<CommandPipeline>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        self.pipeline.gateway().monitor()
    }
}

pub struct TestHarnessBuilder {
    policy: RetryPolicy,
    command_timeout: Duration,
    ttl: Duration,
    confirm: bool,
    presenter: Option<Arc<dyn Presenter>>,
    business: BusinessConfig,
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10)),
            command_timeout: Duration::from_secs(5),
            ttl: Duration::from_secs(600),
            confirm: true,
            presenter: None,
            business: BusinessConfig::default(),
        }
    }
}

impl TestHarnessBuilder {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn declining(mut self) -> Self {
        self.confirm = false;
        self
    }

    /// Route presentation to `presenter` instead of the recording one
    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn with_business(mut self, business: BusinessConfig) -> Self {
        self.business = business;
        self
    }

    pub fn build(self) -> TestHarness {
        let faults = Arc::new(ScriptedFaults::new());
        let backend = Arc::new(InMemoryGateway::with_faults(faults.clone()));
        let monitor = Arc::new(ConnectionMonitor::new(
            backend.clone(),
            Duration::from_millis(50),
        ));
        let gateway = Arc::new(RetryingGateway::new(backend.clone(), monitor, self.policy));

        let presenter = Arc::new(RecordingPresenter::new(self.confirm));
        let routed: Arc<dyn Presenter> = match self.presenter {
            Some(custom) => custom,
            None => presenter.clone(),
        };
        let auth = Arc::new(StaticAuthProvider::new(OPERATOR));

        let pipeline = Arc::new(CommandPipeline::new(
            Arc::new(HandlerRegistry::with_defaults(&self.business)),
            Arc::new(IdempotencyGuard::new(self.ttl)),
            gateway,
            routed,
            auth.clone(),
            self.command_timeout,
        ));

        TestHarness {
            backend,
            faults,
            presenter,
            auth,
            pipeline,
        }
    }
}
