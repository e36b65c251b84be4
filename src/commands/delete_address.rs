use super::{load_required, CommandHandler, ExecutionPlan};
use crate::constants::{collections, fields, messages};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Command, CommandKind, Record, RecordKey};
use crate::resilience::RetryingGateway;
use crate::transaction::Mutation;
use crate::validation::required_str;
use async_trait::async_trait;

/// Removes one of the requester's stored addresses
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteAddressHandler;

impl DeleteAddressHandler {
    async fn load_owned_address(
        &self,
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<Record> {
        let address_id = required_str(command.payload(), fields::ADDRESS_ID)?;
        let address = load_required(
            gateway,
            &RecordKey::new(collections::ADDRESSES, address_id),
            messages::ADDRESS_NOT_FOUND,
        )
        .await?;

        if address.str_field(fields::OWNER_ID) != Some(command.requester_id()) {
            return Err(PipelineError::business_rule(messages::NOT_ADDRESS_OWNER));
        }
        Ok(address)
    }
}

#[async_trait]
impl CommandHandler for DeleteAddressHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::DeleteAddress
    }

    fn validate(&self, command: &Command) -> PipelineResult<()> {
        required_str(command.payload(), fields::ADDRESS_ID).map(|_| ())
    }

    async fn check_invariants(
        &self,
        command: &Command,
        gateway: &RetryingGateway,
    ) -> PipelineResult<()> {
        self.load_owned_address(command, gateway).await.map(|_| ())
    }

    fn confirmation_prompt(&self, command: &Command) -> Option<String> {
        let address_id = required_str(command.payload(), fields::ADDRESS_ID).unwrap_or_default();
        Some(format!("Delete address {address_id}? This cannot be undone."))
    }

    async fn plan(&self, command: &Command, gateway: &RetryingGateway) -> PipelineResult<ExecutionPlan> {
        let address = self.load_owned_address(command, gateway).await?;
        Ok(ExecutionPlan::new(
            vec![Mutation::delete(address.key, address.data)],
            "Address deleted",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{command, gateway};
    use serde_json::json;

    #[tokio::test]
    async fn test_only_owner_may_delete() {
        let (backend, gateway) = gateway();
        backend.seed(Record::new(
            RecordKey::new(collections::ADDRESSES, "addr-1"),
            json!({ "ownerId": "user-1", "street": "Via Roma 1" }),
        ));

        let other = command(CommandKind::DeleteAddress, "user-2", json!({ "addressId": "addr-1" }));
        assert_eq!(
            DeleteAddressHandler.check_invariants(&other, &gateway).await,
            Err(PipelineError::business_rule(messages::NOT_ADDRESS_OWNER))
        );

        let owner = command(CommandKind::DeleteAddress, "user-1", json!({ "addressId": "addr-1" }));
        let plan = DeleteAddressHandler.plan(&owner, &gateway).await.unwrap();
        assert_eq!(plan.mutations.len(), 1);
        assert_eq!(plan.mutations[0].before_state.as_ref().unwrap()["street"], "Via Roma 1");
        assert!(plan.mutations[0].after_state.is_none());
    }

    #[tokio::test]
    async fn test_missing_address() {
        let (_, gateway) = gateway();
        let cmd = command(CommandKind::DeleteAddress, "user-1", json!({ "addressId": "nope" }));
        assert_eq!(
            DeleteAddressHandler.check_invariants(&cmd, &gateway).await,
            Err(PipelineError::business_rule(messages::ADDRESS_NOT_FOUND))
        );
        assert!(DeleteAddressHandler
            .validate(&command(CommandKind::DeleteAddress, "user-1", json!({})))
            .is_err());
    }
}
