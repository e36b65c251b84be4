//! # Transaction Module
//!
//! Unit of work with compensating rollback for one command execution.

pub mod context;
pub mod errors;
pub mod mutation;
pub mod unit_of_work;

pub use context::{TransactionContext, TransactionState};
pub use errors::TransactionError;
pub use mutation::{Mutation, MutationOperation};
pub use unit_of_work::{TransactionScope, UnitOfWork};
