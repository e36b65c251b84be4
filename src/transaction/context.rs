use super::mutation::Mutation;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Committed => write!(f, "committed"),
            Self::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// Mutations of a single command execution and how far their commit got
#[derive(Debug)]
pub struct TransactionContext {
    transaction_id: Uuid,
    pub(super) mutations: Vec<Mutation>,
    pub(super) state: TransactionState,

    /// Prefix of `mutations` known to have been written
    pub(super) applied: usize,

    /// Mutation at index `applied` was being written when commit stopped
    pub(super) in_flight: bool,
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionContext {
    pub(super) fn new() -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            mutations: Vec::new(),
            state: TransactionState::Open,
            applied: 0,
            in_flight: false,
        }
    }

    pub fn transaction_id(&self) -> Uuid {
        self.transaction_id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Number of mutations whose effects may have reached the backend
    pub(super) fn pending_effects(&self) -> usize {
        let in_flight = usize::from(self.in_flight);
        (self.applied + in_flight).min(self.mutations.len())
    }
}
