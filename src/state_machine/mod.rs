// Command lifecycle state machine
//
// RECEIVED -> VALIDATED -> [CONFIRMING] -> EXECUTING -> {COMMITTED, ROLLED_BACK}
// with REJECTED reachable from any state before EXECUTING.

pub mod command_state_machine;
pub mod errors;
pub mod events;
pub mod states;

pub use command_state_machine::{CommandStateMachine, StateTransition};
pub use errors::{StateMachineError, StateMachineResult};
pub use events::CommandEvent;
pub use states::CommandState;
