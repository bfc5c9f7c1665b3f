//! Error taxonomy shared by Docwatch services
//!
//! Each service crate defines its own error enum for its operations; this type
//! covers the cross-cutting failures and is what the configuration loaders
//! return.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocwatchError {
    /// Fatal at startup: the process must not start.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocwatchError {
    pub fn configuration(message: impl Into<String>, key: &str) -> Self {
        DocwatchError::ConfigurationError {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Whether retrying the same operation later could succeed.
    ///
    /// Transport and persistence failures are retried on the next scheduled
    /// cycle; anything else needs a fix first.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            DocwatchError::TransportError(_) | DocwatchError::PersistenceError(_)
        )
    }
}
