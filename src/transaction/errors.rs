use super::context::TransactionState;
use crate::error::PipelineError;
use crate::models::RecordKey;
use crate::resilience::GatewayError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactionError {
    #[error("Transaction {transaction_id} is {state}, expected open")]
    InvalidTransactionState {
        transaction_id: Uuid,
        state: TransactionState,
    },

    #[error("Mutation {index} on {target} failed in transaction {transaction_id}: {source}")]
    MutationFailed {
        transaction_id: Uuid,
        index: usize,
        target: RecordKey,
        source: GatewayError,
        /// Set when undoing the mutations written before the failure also failed
        compensation_failure: Option<String>,
    },

    #[error("Compensation failed for transaction {transaction_id}: {reason}")]
    CompensationFailed { transaction_id: Uuid, reason: String },
}

impl From<TransactionError> for PipelineError {
    fn from(error: TransactionError) -> Self {
        match error {
            TransactionError::MutationFailed { source, .. } => source.into(),
            TransactionError::CompensationFailed {
                transaction_id,
                reason,
            } => PipelineError::CompensationFailed {
                transaction_id: transaction_id.to_string(),
                reason,
            },
            invalid @ TransactionError::InvalidTransactionState { .. } => {
                PipelineError::PersistenceError(invalid.to_string())
            }
        }
    }
}
