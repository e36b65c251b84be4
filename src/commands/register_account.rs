use super::{CommandHandler, ExecutionPlan};
use crate::config::BusinessConfig;
use crate::constants::{collections, fields, messages};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Command, CommandKind, RecordKey};
use crate::resilience::RetryingGateway;
use crate::transaction::Mutation;
use crate::validation::{required_secret, required_str, validate_email, validate_length};
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

/// Creates a user account with a unique username
#[derive(Debug, Clone)]
pub struct RegisterAccountHandler {
    business: BusinessConfig,
}

impl RegisterAccountHandler {
    pub fn new(business: BusinessConfig) -> Self {
        Self { business }
    }
}

#[async_trait]
impl CommandHandler for RegisterAccountHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::RegisterAccount
    }

    fn validate(&self, command: &Command) -> PipelineResult<()> {
        let payload = command.payload();

        let username = required_str(payload, fields::USERNAME)?;
        validate_length(fields::USERNAME, username, 3, 32)?;
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(PipelineError::invalid_input(
                "username may only contain letters, digits, '.' and '_'",
            ));
        }

        let password = required_secret(payload, fields::PASSWORD)?;
        if password.chars().count() < self.business.min_password_length {
            return Err(PipelineError::invalid_input(format!(
                "password must be at least {} characters",
                self.business.min_password_length
            )));
        }

        validate_email(required_str(payload, fields::EMAIL)?)
    }

    async fn check_invariants(
        &self,
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<()> {
        let username = required_str(command.payload(), fields::USERNAME)?;
        let taken = gateway
            .count_where(collections::ACCOUNTS, fields::USERNAME, &json!(username))
            .await?;
        if taken > 0 {
            return Err(PipelineError::business_rule(messages::USERNAME_TAKEN));
        }
        Ok(())
    }

    fn confirmation_prompt(&self, command: &Command) -> Option<String> {
        let username = required_str(command.payload(), fields::USERNAME).unwrap_or_default();
        Some(format!("Register account '{username}'?"))
    }

    async fn plan(
        &self,
        command: &Command,
        _gateway: &RetryingGateway,
    ) -> PipelineResult<ExecutionPlan> {
        let payload = command.payload();
        let account_id = Uuid::new_v4().to_string();
        let account = json!({
            fields::USERNAME: required_str(payload, fields::USERNAME)?,
            fields::PASSWORD: required_secret(payload, fields::PASSWORD)?,
            fields::EMAIL: required_str(payload, fields::EMAIL)?,
            fields::CREATED_AT: command.created_at().to_rfc3339(),
        });

        Ok(ExecutionPlan::new(
            vec![Mutation::create(
                RecordKey::new(collections::ACCOUNTS, &account_id),
                account,
            )],
            "Account registered",
        )
        .producing(account_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{command, gateway};
    use crate::models::Record;

    fn handler() -> RegisterAccountHandler {
        RegisterAccountHandler::new(BusinessConfig::default())
    }

    #[test]
    fn test_validation() {
        let h = handler();
        let ok = command(
            CommandKind::RegisterAccount,
            "anon",
            json!({ "username": "ada.l", "password": "correct horse", "email": "ada@example.org" }),
        );
        assert!(h.validate(&ok).is_ok());

        for payload in [
            json!({ "username": "ad", "password": "correct horse", "email": "ada@example.org" }),
            json!({ "username": "ada lovelace", "password": "correct horse", "email": "ada@example.org" }),
            json!({ "username": "ada", "password": "short", "email": "ada@example.org" }),
            json!({ "username": "ada", "password": "correct horse", "email": "not-an-email" }),
            json!({ "password": "correct horse", "email": "ada@example.org" }),
        ] {
            let cmd = command(CommandKind::RegisterAccount, "anon", payload);
            assert!(matches!(h.validate(&cmd), Err(PipelineError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_username_must_be_unique() {
        let (backend, gateway) = gateway();
        backend.seed(Record::new(
            RecordKey::new(collections::ACCOUNTS, "a1"),
            json!({ "username": "ada" }),
        ));

        let cmd = command(
            CommandKind::RegisterAccount,
            "anon",
            json!({ "username": "ada", "password": "correct horse", "email": "ada@example.org" }),
        );
        assert_eq!(
            handler().check_invariants(&cmd, &gateway).await,
            Err(PipelineError::business_rule(messages::USERNAME_TAKEN))
        );
    }

    #[tokio::test]
    async fn test_plan_creates_account() {
        let (_, gateway) = gateway();
        let cmd = command(
            CommandKind::RegisterAccount,
            "anon",
            json!({ "username": "grace", "password": "correct horse", "email": "grace@example.org" }),
        );
        let plan = handler().plan(&cmd, &gateway).await.unwrap();
        assert_eq!(plan.mutations.len(), 1);
        assert_eq!(plan.mutations[0].target.collection, collections::ACCOUNTS);
        assert_eq!(plan.produced_id.as_deref(), Some(plan.mutations[0].target.id.as_str()));
        assert!(handler().confirmation_prompt(&cmd).is_some());
    }
}
