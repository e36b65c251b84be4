//! # Persistence
//!
//! The backend boundary. [`PersistenceGateway`] is the consumed interface;
//! [`InMemoryGateway`] is the reference implementation used by tests and the
//! default wiring, with [`ScriptedFaults`] for deterministic failure injection.

pub mod faults;
pub mod gateway;
pub mod memory;

pub use faults::{FaultInjector, NoFaults, ScriptedFaults};
pub use gateway::{BackendError, BackendResult, GatewayOperation, PersistenceGateway};
pub use memory::InMemoryGateway;
