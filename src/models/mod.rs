pub mod command;
pub mod command_result;
pub mod record;

// Re-export core models for easy access
pub use command::{Command, CommandKind};
pub use command_result::CommandResult;
pub use record::{Record, RecordKey};
