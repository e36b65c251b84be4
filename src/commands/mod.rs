//! # Command Handlers
//!
//! One [`CommandHandler`] per [`CommandKind`]. The pipeline drives every
//! handler through the same sequence: structural `validate`, business
//! `check_invariants` against current backend state, an optional
//! confirmation prompt, then `plan` to produce the mutations the unit of work
//! commits. Handlers never write to the backend themselves.

pub mod change_password;
pub mod delete_address;
pub mod insert_banner;
pub mod insert_tag;
pub mod record_justification;
pub mod register_account;
pub mod registry;

pub use change_password::ChangePasswordHandler;
pub use delete_address::DeleteAddressHandler;
pub use insert_banner::InsertBannerHandler;
pub use insert_tag::InsertTagHandler;
pub use record_justification::RecordJustificationHandler;
pub use register_account::RegisterAccountHandler;
pub use registry::HandlerRegistry;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Command, CommandKind, Record, RecordKey};
use crate::resilience::RetryingGateway;
use crate::transaction::Mutation;
use async_trait::async_trait;

/// What a confirmed command will write
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub mutations: Vec<Mutation>,

    /// Identifier reported back on success
    pub produced_id: Option<String>,

    pub success_message: String,
}

impl ExecutionPlan {
    pub fn new(mutations: Vec<Mutation>, success_message: impl Into<String>) -> Self {
        Self {
            mutations,
            produced_id: None,
            success_message: success_message.into(),
        }
    }

    pub fn producing(mut self, id: impl Into<String>) -> Self {
        self.produced_id = Some(id.into());
        self
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn kind(&self) -> CommandKind;

    /// Structural checks on the payload; no backend access
    fn validate(&self, command: &Command) -> PipelineResult<()>;

    /// Business rules evaluated against current backend state
    async fn check_invariants(
        &self,
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<()>;

    /// Prompt to show before executing, `None` to execute without asking
    fn confirmation_prompt(&self, command: &Command) -> Option<String>;

    /// Mutations to commit, built from a fresh read of the records involved
    async fn plan(&self, command: &Command, gateway: &RetryingGateway)
        -> PipelineResult<ExecutionPlan>;
}

/// Read a record the command depends on, mapping absence to a business rule violation
pub(crate) async fn load_required(
    gateway: &RetryingGateway,
    key: &RecordKey,
    missing_message: &str,
) -> PipelineResult<Record> {
    gateway
        .find_by_id(key)
        .await?
        .ok_or_else(|| PipelineError::business_rule(missing_message))
}
