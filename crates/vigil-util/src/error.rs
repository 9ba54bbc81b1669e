//! Error types for vigild

use thiserror::Error;

use crate::{OperatorId, TaskId};

/// Core error type for vigild operations
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("Operator not authorized: {0}")]
    Unauthorized(OperatorId),

    #[error("Command not whitelisted: {0}")]
    NotWhitelisted(String),

    #[error("Invalid time format '{0}', expected HH:MM")]
    InvalidTimeFormat(String),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Command timed out after {0}s")]
    CommandTimeout(u64),

    #[error("Frame source failure: {0}")]
    DeviceFailure(String),

    #[error("No speech recognized in transcript")]
    TranscriptionEmpty,

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VigilError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::DeviceFailure(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Message shown to the requesting operator.
    ///
    /// Policy failures are spelled out; anything internal is collapsed to a
    /// generic message, with the detail kept in the operational log only.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(_) => "Access denied. You are not authorized.".into(),
            Self::NotWhitelisted(cmd) => format!("Command not permitted: {cmd}"),
            Self::InvalidTimeFormat(value) => {
                format!("Invalid time '{value}'. Use HH:MM (24-hour).")
            }
            Self::TaskNotFound(id) => format!("No task with id {id}"),
            Self::CommandTimeout(secs) => format!("Command timed out ({secs}s)"),
            Self::TranscriptionEmpty => "Could not recognize any speech.".into(),
            Self::DeviceFailure(_)
            | Self::StoreError(_)
            | Self::ConfigError(_)
            | Self::TransportError(_)
            | Self::Internal(_) => "An internal error occurred.".into(),
        }
    }
}

pub type VigilResult<T> = Result<T, VigilError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_hidden_from_operators() {
        let err = VigilError::store("disk full at /var/lib/vigild/vigild.db");
        assert_eq!(err.user_message(), "An internal error occurred.");
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn policy_errors_are_explicit() {
        let err = VigilError::Unauthorized(OperatorId::new("9942"));
        assert_eq!(err.user_message(), "Access denied. You are not authorized.");

        let err = VigilError::NotWhitelisted("rm -rf /".into());
        assert!(err.user_message().contains("rm -rf /"));

        let err = VigilError::CommandTimeout(30);
        assert!(err.user_message().contains("30s"));
    }
}
