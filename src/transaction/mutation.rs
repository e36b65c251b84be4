use crate::models::{Record, RecordKey};
use crate::resilience::{GatewayResult, RetryingGateway};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOperation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for MutationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One pending change and enough state to undo it.
///
/// `before_state` is the snapshot prior to the change (absent for creates);
/// `after_state` is what gets written (absent for deletes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub target: RecordKey,
    pub operation: MutationOperation,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
}

impl Mutation {
    pub fn create(target: RecordKey, after: Value) -> Self {
        Self {
            target,
            operation: MutationOperation::Create,
            before_state: None,
            after_state: Some(after),
        }
    }

    pub fn update(target: RecordKey, before: Value, after: Value) -> Self {
        Self {
            target,
            operation: MutationOperation::Update,
            before_state: Some(before),
            after_state: Some(after),
        }
    }

    pub fn delete(target: RecordKey, before: Value) -> Self {
        Self {
            target,
            operation: MutationOperation::Delete,
            before_state: Some(before),
            after_state: None,
        }
    }

    /// Write the change through the gateway
    pub async fn apply(&self, gateway: &RetryingGateway) -> GatewayResult<()> {
        match (&self.operation, &self.after_state) {
            (MutationOperation::Delete, _) | (_, None) => {
                gateway.delete(&self.target).await?;
            }
            (_, Some(after)) => {
                gateway
                    .save(Record::new(self.target.clone(), after.clone()))
                    .await?;
            }
        }
        Ok(())
    }

    /// Restore the target to `before_state`.
    ///
    /// Safe to run whether or not `apply` reached the backend.
    pub async fn compensate(&self, gateway: &RetryingGateway) -> GatewayResult<()> {
        match &self.before_state {
            Some(before) => {
                gateway
                    .save(Record::new(self.target.clone(), before.clone()))
                    .await?;
            }
            None => {
                gateway.delete(&self.target).await?;
            }
        }
        Ok(())
    }
}
