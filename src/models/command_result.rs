use crate::error::{ErrorKind, PipelineError};
use serde::{Deserialize, Serialize};

/// Outcome of a command, returned to the caller and cached by the idempotency guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,

    /// User-facing message
    pub message: String,

    /// Identifier of the entity the command created, if any
    pub produced_id: Option<String>,

    /// Failure classification, `None` on success
    pub error_kind: Option<ErrorKind>,

    /// A new submission with a fresh key may succeed
    pub retryable: bool,
}

impl CommandResult {
    pub fn success(message: impl Into<String>, produced_id: Option<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            produced_id,
            error_kind: None,
            retryable: false,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            produced_id: None,
            error_kind: Some(kind),
            retryable: kind.is_retryable(),
        }
    }

    pub fn from_error(error: &PipelineError) -> Self {
        Self::failure(error.kind(), error.user_message())
    }

    pub fn is_failure_of(&self, kind: ErrorKind) -> bool {
        self.error_kind == Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_from_error_carries_kind_and_retryability() {
        let err = PipelineError::ConnectionInterrupted {
            operation: "save".to_string(),
        };
        let result = CommandResult::from_error(&err);
        assert!(!result.success);
        assert!(result.retryable);
        assert!(result.is_failure_of(ErrorKind::ConnectionInterrupted));

        let result = CommandResult::from_error(&PipelineError::business_rule("Max banners reached"));
        assert_eq!(result.message, "Max banners reached");
        assert!(!result.retryable);
    }

    #[test]
    fn test_success_has_no_error_kind() {
        let result = CommandResult::success("Tag inserted", Some("tag-1".to_string()));
        assert!(result.success);
        assert_eq!(result.error_kind, None);
        assert_eq!(result.produced_id.as_deref(), Some("tag-1"));
    }
}
