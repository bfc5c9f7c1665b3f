//! Structured logging initialization
//!
//! Every Docwatch binary calls [`init_logging`] once at startup. Services log
//! through `tracing` macros with structured fields; the subscriber writes JSON
//! lines in production and human-readable output in development.

use crate::config::env_string;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Invalid log format: {0} (expected 'json' or 'pretty')")]
    InvalidFormat(String),

    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = ObservabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(ObservabilityError::InvalidFormat(other.to_string())),
        }
    }
}

/// Logging configuration
///
/// # Environment Variables
///
/// - `DOCWATCH_LOG_LEVEL` or `RUST_LOG` (optional): filter directive (default: "info")
/// - `DOCWATCH_LOG_FORMAT` (optional): "json" or "pretty" (default: "json")
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub service_name: String,
    pub filter: String,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            filter: "info".to_string(),
            format: LogFormat::Json,
        }
    }

    pub fn from_env(service_name: impl Into<String>) -> Result<Self, ObservabilityError> {
        let filter = env_string("DOCWATCH_LOG_LEVEL")
            .or_else(|| env_string("RUST_LOG"))
            .unwrap_or_else(|| "info".to_string());

        let format = match env_string("DOCWATCH_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::Json,
        };

        Ok(Self {
            service_name: service_name.into(),
            filter,
            format,
        })
    }
}

/// Install the global tracing subscriber.
///
/// Must be called once per process; a second call returns
/// `ObservabilityError::SubscriberInit`.
pub fn init_logging(config: &LogConfig) -> Result<(), ObservabilityError> {
    let env_filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| ObservabilityError::InvalidFilter(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true),
            )
            .try_init(),
    }
    .map_err(|e| ObservabilityError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service_name = %config.service_name,
        filter = %config.filter,
        format = ?config.format,
        "Logging initialized"
    );

    Ok(())
}
