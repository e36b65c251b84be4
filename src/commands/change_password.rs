use super::{load_required, CommandHandler, ExecutionPlan};
use crate::config::BusinessConfig;
use crate::constants::{collections, fields, messages};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Command, CommandKind, Record, RecordKey};
use crate::resilience::RetryingGateway;
use crate::transaction::Mutation;
use crate::validation::{required_secret, required_str};
use async_trait::async_trait;
use serde_json::Value;

/// Replaces the requester's own password after verifying the current one
#[derive(Debug, Clone)]
pub struct ChangePasswordHandler {
    business: BusinessConfig,
}

impl ChangePasswordHandler {
    pub fn new(business: BusinessConfig) -> Self {
        Self { business }
    }

    async fn load_owned_account(
        &self,
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<Record> {
        let account_id = required_str(command.payload(), fields::ACCOUNT_ID)?;
        let account = load_required(
            gateway,
            &RecordKey::new(collections::ACCOUNTS, account_id),
            messages::ACCOUNT_NOT_FOUND,
        )
        .await?;

        if account.id() != command.requester_id() {
            return Err(PipelineError::business_rule(messages::NOT_ACCOUNT_OWNER));
        }

        let current = required_secret(command.payload(), fields::CURRENT_PASSWORD)?;
        if account.str_field(fields::PASSWORD) != Some(current) {
            return Err(PipelineError::business_rule(messages::WRONG_PASSWORD));
        }
        Ok(account)
    }
}

#[async_trait]
impl CommandHandler for ChangePasswordHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::ChangePassword
    }

    fn validate(&self, command: &Command) -> PipelineResult<()> {
        let payload = command.payload();
        required_str(payload, fields::ACCOUNT_ID)?;
        let current = required_secret(payload, fields::CURRENT_PASSWORD)?;
        let new = required_secret(payload, fields::NEW_PASSWORD)?;
        let confirm = required_secret(payload, fields::CONFIRM_PASSWORD)?;

        if new.chars().count() < self.business.min_password_length {
            return Err(PipelineError::invalid_input(format!(
                "newPassword must be at least {} characters",
                self.business.min_password_length
            )));
        }
        if new != confirm {
            return Err(PipelineError::invalid_input(messages::PASSWORDS_DO_NOT_MATCH));
        }
        if new == current {
            return Err(PipelineError::invalid_input(messages::PASSWORD_UNCHANGED));
        }
        Ok(())
    }

    async fn check_invariants(
        &self,
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<()> {
        self.load_owned_account(command, gateway).await.map(|_| ())
    }

    fn confirmation_prompt(&self, _command: &Command) -> Option<String> {
        Some("Change your password?".to_string())
    }

    async fn plan(&self, command: &Command, gateway: &RetryingGateway) -> PipelineResult<ExecutionPlan> {
        let account = self.load_owned_account(command, gateway).await?;
        let new_password = required_secret(command.payload(), fields::NEW_PASSWORD)?;

        let mut updated = account.data.clone();
        if let Value::Object(map) = &mut updated {
            map.insert(fields::PASSWORD.to_string(), Value::from(new_password));
        }

        Ok(ExecutionPlan::new(
            vec![Mutation::update(account.key.clone(), account.data, updated)],
            "Password changed",
        ))
    }
}
