//! # Docwatch Core
//!
//! Shared building blocks for the Docwatch services.
//!
//! ## Modules
//!
//! - `error`: Cross-cutting error taxonomy
//! - `config`: Environment configuration loading and validation
//! - `observability`: Structured logging initialization
//! - `schedule`: Cron-style recurring job scheduler
//! - `shutdown`: Signal handling for graceful shutdown

pub mod config;
pub mod error;
pub mod observability;
pub mod schedule;
pub mod shutdown;

pub use config::{
    load_dotenv, AuthConfig, ConfigLoader, DatabaseConfig, RpcServerConfig, ServiceKey,
    TlsConfig,
};
pub use error::DocwatchError;
pub use observability::{init_logging, LogConfig, LogFormat, ObservabilityError};
pub use schedule::{CronJob, CronScheduler};
pub use shutdown::{wait_for_signal, ShutdownReason};

/// Result type alias for Docwatch operations
pub type Result<T> = std::result::Result<T, DocwatchError>;
