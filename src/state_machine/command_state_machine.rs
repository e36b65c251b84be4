use super::{
    errors::{StateMachineError, StateMachineResult},
    events::CommandEvent,
    states::CommandState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One recorded state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: CommandState,
    pub to: CommandState,
    pub event: CommandEvent,
    pub at: DateTime<Utc>,
}

/// In-memory state machine for a single command execution
#[derive(Debug, Clone)]
pub struct CommandStateMachine {
    command_id: String,
    current: CommandState,
    history: Vec<StateTransition>,
}

impl CommandStateMachine {
    pub fn new(command_id: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            current: CommandState::default(),
            history: Vec::new(),
        }
    }

    pub fn current_state(&self) -> CommandState {
        self.current
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn command_id(&self) -> &str {
        &self.command_id
    }

    /// Attempt to transition the command state
    pub fn transition(&mut self, event: CommandEvent) -> StateMachineResult<CommandState> {
        let from = self.current;
        let to = Self::determine_target_state(from, &event)?;

        debug!(
            command_id = %self.command_id,
            from = %from,
            to = %to,
            event = event.event_type(),
            "Command state transition"
        );

        self.current = to;
        self.history.push(StateTransition {
            from,
            to,
            event,
            at: Utc::now(),
        });
        Ok(to)
    }

    /// Determine the target state based on current state and event
    fn determine_target_state(
        current_state: CommandState,
        event: &CommandEvent,
    ) -> StateMachineResult<CommandState> {
        let target = match (current_state, event) {
            // Forward path
            (CommandState::Received, CommandEvent::Validate) => CommandState::Validated,
            (CommandState::Validated, CommandEvent::RequestConfirmation) => {
                CommandState::Confirming
            }
            (CommandState::Validated, CommandEvent::Execute) => CommandState::Executing,
            (CommandState::Confirming, CommandEvent::Execute) => CommandState::Executing,
            (CommandState::Executing, CommandEvent::Commit) => CommandState::Committed,

            // Failure during execution
            (CommandState::Executing, CommandEvent::RollBack(_)) => CommandState::RolledBack,

            // Refusal before execution
            (
                CommandState::Received | CommandState::Validated | CommandState::Confirming,
                CommandEvent::Reject(_),
            ) => CommandState::Rejected,

            // Cached outcome
            (CommandState::Received, CommandEvent::Replay { success: true }) => {
                CommandState::Committed
            }
            (CommandState::Received, CommandEvent::Replay { success: false }) => {
                CommandState::Rejected
            }

            // Invalid transitions
            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}
