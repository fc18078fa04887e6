//! Domain-specific error types for transparency-lens

use thiserror::Error;

/// Main error type for the interview client
#[derive(Error, Debug)]
pub enum LensError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Product ID missing: no subject has been created for this session")]
    MissingSubject,

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Cancelled: {operation} was cancelled")]
    Cancelled { operation: String },

    #[error("Session busy: another operation is still in flight")]
    Busy,

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl LensError {
    pub fn validation(message: impl Into<String>) -> Self {
        LensError::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        LensError::InvalidState {
            message: message.into(),
        }
    }

    /// True for failures of an external call, as opposed to rejected transitions.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            LensError::Transport { .. }
                | LensError::Server { .. }
                | LensError::Timeout { .. }
                | LensError::Cancelled { .. }
        )
    }
}

impl From<anyhow::Error> for LensError {
    fn from(err: anyhow::Error) -> Self {
        LensError::Config {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for LensError {
    fn from(err: serde_json::Error) -> Self {
        LensError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for LensError {
    fn from(err: std::io::Error) -> Self {
        LensError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type alias for transparency-lens operations
pub type Result<T> = std::result::Result<T, LensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_surfaces_status_and_message() {
        let err = LensError::Server {
            status: 422,
            message: "name is required".into(),
        };
        assert_eq!(err.to_string(), "Server error (422): name is required");
        assert!(err.is_external());
    }

    #[test]
    fn rejected_transitions_are_not_external() {
        assert!(!LensError::MissingSubject.is_external());
        assert!(!LensError::Busy.is_external());
        assert!(!LensError::validation("empty answer").is_external());
    }

    #[test]
    fn timeout_message_names_operation() {
        let err = LensError::Timeout {
            operation: "submit score".into(),
            timeout_ms: 1500,
        };
        assert_eq!(
            err.to_string(),
            "Timeout error: submit score timed out after 1500ms"
        );
    }
}
