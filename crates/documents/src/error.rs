use docwatch_core::DocwatchError;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Dispatch failed: {message}")]
    Dispatch { message: String, retriable: bool },

    #[error("Dispatch timed out after {0:?}")]
    Timeout(Duration),

    #[error("An expiry cycle is already in progress")]
    CycleInProgress,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DocumentError {
    pub fn dispatch(message: impl Into<String>, retriable: bool) -> Self {
        DocumentError::Dispatch {
            message: message.into(),
            retriable,
        }
    }

    /// Whether the next cycle could succeed without a fix on our side.
    pub fn is_retriable(&self) -> bool {
        match self {
            DocumentError::Dispatch { retriable, .. } => *retriable,
            DocumentError::Persistence(_)
            | DocumentError::Timeout(_)
            | DocumentError::CycleInProgress => true,
            DocumentError::Configuration(_) => false,
        }
    }
}

impl From<sqlx::Error> for DocumentError {
    fn from(err: sqlx::Error) -> Self {
        DocumentError::Persistence(err.to_string())
    }
}

impl From<DocwatchError> for DocumentError {
    fn from(err: DocwatchError) -> Self {
        match err {
            DocwatchError::ConfigurationError { message, .. } => DocumentError::Configuration(message),
            DocwatchError::PersistenceError(message) => DocumentError::Persistence(message),
            other => {
                let retriable = other.is_retriable();
                DocumentError::dispatch(other.to_string(), retriable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(DocumentError::dispatch("connection refused", true).is_retriable());
        assert!(!DocumentError::dispatch("invalid service key", false).is_retriable());
        assert!(DocumentError::Timeout(Duration::from_secs(10)).is_retriable());
        assert!(DocumentError::Persistence("connection reset".into()).is_retriable());
        assert!(!DocumentError::Configuration("bad threshold".into()).is_retriable());
    }

    #[test]
    fn test_core_error_keeps_classification() {
        let err: DocumentError = DocwatchError::TransportError("refused".into()).into();
        assert!(matches!(err, DocumentError::Dispatch { retriable: true, .. }));

        let err: DocumentError = DocwatchError::Internal("poisoned".into()).into();
        assert!(matches!(err, DocumentError::Dispatch { retriable: false, .. }));
    }
}
