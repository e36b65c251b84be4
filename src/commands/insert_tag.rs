use super::{CommandHandler, ExecutionPlan};
use crate::constants::{collections, fields, messages};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Command, CommandKind, RecordKey};
use crate::resilience::RetryingGateway;
use crate::transaction::Mutation;
use crate::validation::{optional_str, required_str, validate_length};
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

/// Adds a search tag; names are unique ignoring case
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertTagHandler;

#[async_trait]
impl CommandHandler for InsertTagHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::InsertTag
    }

    fn validate(&self, command: &Command) -> PipelineResult<()> {
        let payload = command.payload();
        let name = required_str(payload, fields::NAME)?;
        validate_length(fields::NAME, name, 2, 30)?;
        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
        {
            return Err(PipelineError::invalid_input(
                "name may only contain letters, digits, spaces, '-' and '_'",
            ));
        }

        if let Some(description) = optional_str(payload, fields::DESCRIPTION)? {
            validate_length(fields::DESCRIPTION, description, 0, 255)?;
        }
        Ok(())
    }

    async fn check_invariants(
        &self,
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<()> {
        let name = required_str(command.payload(), fields::NAME)?.to_lowercase();
        let exists = gateway
            .find_all(collections::TAGS)
            .await?
            .iter()
            .filter_map(|tag| tag.str_field(fields::NAME))
            .any(|existing| existing.to_lowercase() == name);

        if exists {
            return Err(PipelineError::business_rule(messages::TAG_EXISTS));
        }
        Ok(())
    }

    fn confirmation_prompt(&self, _command: &Command) -> Option<String> {
        None
    }

    async fn plan(
        &self,
        command: &Command,
        _gateway: &RetryingGateway,
    ) -> PipelineResult<ExecutionPlan> {
        let payload = command.payload();
        let tag_id = Uuid::new_v4().to_string();
        let tag = json!({
            fields::NAME: required_str(payload, fields::NAME)?,
            fields::DESCRIPTION: optional_str(payload, fields::DESCRIPTION)?.unwrap_or_default(),
            fields::CREATED_BY: command.requester_id(),
            fields::CREATED_AT: command.created_at().to_rfc3339(),
        });

        Ok(ExecutionPlan::new(
            vec![Mutation::create(RecordKey::new(collections::TAGS, &tag_id), tag)],
            "Tag inserted",
        )
        .producing(tag_id))
    }
}
