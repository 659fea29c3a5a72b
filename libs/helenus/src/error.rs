use scylla::errors::{ExecutionError, NewSessionError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::mapping::ValueError;

/// Unified error type for mapping, statement construction and execution
#[derive(Debug, Error)]
pub enum HelenusError {
    /// Statement could not be mapped onto entity metadata
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A required argument was absent, empty or null
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The driver failed to execute a statement
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// The driver failed to open a session
    #[error("Connection error: {0}")]
    NewSession(#[from] NewSessionError),

    /// The driver returned rows that could not be decoded
    #[error("Result error: {0}")]
    Result(String),

    /// A column value had an unexpected CQL type
    #[error("Cannot convert column '{column}': {source}")]
    Conversion { column: String, source: ValueError },

    /// Error reported by a non-scylla statement executor
    #[error("Driver error: {0}")]
    Driver(String),

    /// A spawned operation panicked or was cancelled
    #[error("Operation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl HelenusError {
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether this error was raised while building a statement, before any I/O
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Self::Mapping(_) | Self::InvalidArgument(_))
    }
}

/// Result type alias for Helenus operations
pub type HelenusResult<T> = Result<T, HelenusError>;

/// First construction error recorded by a fluent builder chain.
///
/// Builder methods return `Self`, so failures such as an unresolved getter
/// are parked here and surfaced by `build_statement()`.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingError(Option<Pending>);

#[derive(Debug, Clone)]
enum Pending {
    Mapping(String),
    InvalidArgument(String),
}

impl PendingError {
    pub(crate) fn record(&mut self, error: HelenusError) {
        if self.0.is_some() {
            return;
        }
        self.0 = Some(match error {
            HelenusError::InvalidArgument(message) => Pending::InvalidArgument(message),
            HelenusError::Mapping(message) => Pending::Mapping(message),
            other => Pending::Mapping(other.to_string()),
        });
    }

    pub(crate) fn check(&self) -> HelenusResult<()> {
        match &self.0 {
            None => Ok(()),
            Some(Pending::Mapping(message)) => Err(HelenusError::Mapping(message.clone())),
            Some(Pending::InvalidArgument(message)) => {
                Err(HelenusError::InvalidArgument(message.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_error_keeps_first() {
        let mut pending = PendingError::default();
        assert!(pending.check().is_ok());

        pending.record(HelenusError::invalid_argument("value[1] is empty"));
        pending.record(HelenusError::mapping("second"));

        let err = pending.check().unwrap_err();
        assert!(matches!(err, HelenusError::InvalidArgument(_)));
        assert!(err.to_string().contains("value[1]"));
    }

    #[test]
    fn test_construction_error_classification() {
        assert!(HelenusError::mapping("x").is_construction_error());
        assert!(HelenusError::invalid_argument("x").is_construction_error());
        assert!(!HelenusError::Driver("x".into()).is_construction_error());
    }
}
