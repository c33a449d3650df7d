//! Error types shared by middleware, handlers and the dispatcher.

use thiserror::Error;

/// Result of running a command: the handler's output or a failure.
pub type CommandResult = Result<serde_json::Value, CommandError>;

/// A single rejected parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Parameter name, empty for whole-command failures.
    pub field: String,
    /// What was wrong with it.
    pub message: String,
}

impl Violation {
    /// Create a violation for a field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Errors produced while running a command.
///
/// Nothing in the pipeline panics or raises across a component boundary:
/// every failure, including a handler panic, ends up as one of these.
///
/// # Example
///
/// ```
/// use clikit::middleware::CommandError;
///
/// let error = CommandError::not_found("deploy");
/// assert_eq!(error.to_string(), "handler not found: deploy");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Parameters or the command itself failed validation.
    #[error("validation failed: {message}")]
    ValidationFailed {
        /// Summary of the failure.
        message: String,
        /// Individual rejected fields, if any.
        violations: Vec<Violation>,
    },

    /// No handler is registered for the command key.
    #[error("handler not found: {key}")]
    HandlerNotFound {
        /// Key that was looked up.
        key: String,
    },

    /// The value handed to the dispatcher is not a command.
    #[error("not a command: {reason}")]
    NotACommand {
        /// Why the value was rejected.
        reason: String,
    },

    /// A handler was registered twice for the same key.
    #[error("handler already registered: {key}")]
    DuplicateHandler {
        /// The duplicated key.
        key: String,
    },

    /// The handler ran and reported a failure.
    #[error("execution failed: {message}")]
    ExecutionFailed {
        /// Description of the failure.
        message: String,
    },

    /// The handler panicked; the panic was caught at the dispatcher boundary.
    #[error("handler panicked: {message}")]
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },
}

impl CommandError {
    /// Create a ValidationFailed error from individual violations.
    pub fn validation(violations: Vec<Violation>) -> Self {
        let message = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self::ValidationFailed {
            message,
            violations,
        }
    }

    /// Create a ValidationFailed error with a message only.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
            violations: Vec::new(),
        }
    }

    /// Create a HandlerNotFound error for the given key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::HandlerNotFound { key: key.into() }
    }

    /// Create a NotACommand error.
    pub fn not_a_command(reason: impl Into<String>) -> Self {
        Self::NotACommand {
            reason: reason.into(),
        }
    }

    /// Create a DuplicateHandler error for the given key.
    pub fn duplicate(key: impl Into<String>) -> Self {
        Self::DuplicateHandler { key: key.into() }
    }

    /// Create an ExecutionFailed error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    /// Whether running the same invocation again could change the outcome.
    ///
    /// Validation, routing and registration failures are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExecutionFailed { .. } | Self::Panicked { .. })
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::ExecutionFailed {
            message: format!("{:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_violations() {
        let error = CommandError::validation(vec![
            Violation::new("name", "is required"),
            Violation::new("count", "expected integer"),
        ]);
        assert_eq!(
            error.to_string(),
            "validation failed: name: is required; count: expected integer"
        );
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(CommandError::execution("flaky").is_retryable());
        assert!(!CommandError::invalid("bad").is_retryable());
        assert!(!CommandError::not_found("x").is_retryable());
        assert!(!CommandError::not_a_command("x").is_retryable());
    }

    #[test]
    fn test_from_anyhow_keeps_context_chain() {
        let err = anyhow::anyhow!("disk full").context("writing report");
        let error = CommandError::from(err);
        assert_eq!(error.to_string(), "execution failed: writing report: disk full");
    }
}
