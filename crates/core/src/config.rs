//! Shared configuration loader module for Docwatch services
//!
//! All configuration is read from environment variables with the `DOCWATCH_`
//! prefix, after an optional `.env` file has been loaded. Each component owns
//! an explicit config struct that is built once in `main` and handed to the
//! component; nothing reads the environment after startup.
//!
//! # Example
//!
//! ```no_run
//! use docwatch_core::config::{load_dotenv, AuthConfig, ConfigLoader, RpcServerConfig};
//!
//! # fn example() -> Result<(), docwatch_core::DocwatchError> {
//! load_dotenv();
//!
//! let rpc = RpcServerConfig::from_env()?;
//! let auth = AuthConfig::from_env()?;
//! rpc.validate()?;
//! auth.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::DocwatchError;
use std::fmt;
use std::path::PathBuf;
use subtle::ConstantTimeEq;
use url::Url;

/// Configuration loader trait
///
/// Provides standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables, applying defaults for
    /// optional values.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a required variable is missing or a
    /// value cannot be parsed.
    fn from_env() -> Result<Self, DocwatchError>;

    /// Validate configuration values.
    fn validate(&self) -> Result<(), DocwatchError>;
}

/// Shared secret authenticating inter-service calls.
///
/// The value is only reachable through [`ServiceKey::expose`]; `Debug` and
/// `Display` are redacted so the key never ends up in logs.
#[derive(Clone)]
pub struct ServiceKey(String);

impl ServiceKey {
    pub fn new(value: impl Into<String>) -> Result<Self, DocwatchError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DocwatchError::configuration(
                "service key must not be empty",
                "DOCWATCH_SERVICE_KEY",
            ));
        }
        Ok(Self(value))
    }

    /// Byte-for-byte comparison in constant time.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();
        expected.len() == candidate.len() && bool::from(expected.ct_eq(candidate))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey(****)")
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "****")
    }
}

/// Service authentication configuration
///
/// # Environment Variables
///
/// - `DOCWATCH_SERVICE_KEY` (required): shared secret for backend-to-backend calls
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub service_key: ServiceKey,
}

impl ConfigLoader for AuthConfig {
    fn from_env() -> Result<Self, DocwatchError> {
        let raw = env_string("DOCWATCH_SERVICE_KEY").ok_or_else(|| {
            DocwatchError::configuration(
                "DOCWATCH_SERVICE_KEY environment variable is required",
                "DOCWATCH_SERVICE_KEY",
            )
        })?;

        Ok(Self {
            service_key: ServiceKey::new(raw)?,
        })
    }

    fn validate(&self) -> Result<(), DocwatchError> {
        if self.service_key.expose().trim().is_empty() {
            return Err(DocwatchError::configuration(
                "service key must not be blank",
                "DOCWATCH_SERVICE_KEY",
            ));
        }
        Ok(())
    }
}

/// Transport encryption settings for the RPC server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub enabled: bool,
    /// PEM certificate chain
    pub cert_file: PathBuf,
    /// PEM private key
    pub key_file: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cert_file: PathBuf::from("certs/server.crt"),
            key_file: PathBuf::from("certs/server.key"),
        }
    }
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// RPC server configuration
///
/// # Environment Variables
///
/// - `DOCWATCH_RPC_HOST` (optional): bind host (default: "0.0.0.0")
/// - `DOCWATCH_RPC_PORT` (optional): bind port (default: 9090)
/// - `DOCWATCH_RPC_TLS_ENABLED` (optional): serve over TLS (default: true)
/// - `DOCWATCH_RPC_TLS_CERT_FILE` (optional): certificate path (default: "certs/server.crt")
/// - `DOCWATCH_RPC_TLS_KEY_FILE` (optional): private key path (default: "certs/server.key")
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: TlsConfig,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
            tls: TlsConfig::default(),
        }
    }
}

impl RpcServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ConfigLoader for RpcServerConfig {
    fn from_env() -> Result<Self, DocwatchError> {
        let defaults = RpcServerConfig::default();

        let host = env_string("DOCWATCH_RPC_HOST").unwrap_or(defaults.host);
        let port = parse_env_var("DOCWATCH_RPC_PORT", defaults.port)?;
        let enabled = parse_env_bool("DOCWATCH_RPC_TLS_ENABLED", defaults.tls.enabled)?;
        let cert_file = env_string("DOCWATCH_RPC_TLS_CERT_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.tls.cert_file);
        let key_file = env_string("DOCWATCH_RPC_TLS_KEY_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.tls.key_file);

        Ok(Self {
            host,
            port,
            tls: TlsConfig {
                enabled,
                cert_file,
                key_file,
            },
        })
    }

    fn validate(&self) -> Result<(), DocwatchError> {
        if self.port == 0 {
            return Err(DocwatchError::configuration(
                "port must be greater than 0",
                "DOCWATCH_RPC_PORT",
            ));
        }

        if self.tls.enabled {
            if self.tls.cert_file.as_os_str().is_empty() {
                return Err(DocwatchError::configuration(
                    "TLS is enabled but no certificate file is configured",
                    "DOCWATCH_RPC_TLS_CERT_FILE",
                ));
            }
            if self.tls.key_file.as_os_str().is_empty() {
                return Err(DocwatchError::configuration(
                    "TLS is enabled but no key file is configured",
                    "DOCWATCH_RPC_TLS_KEY_FILE",
                ));
            }
        }

        Ok(())
    }
}

/// Database configuration
///
/// The database is optional: without a URL the document services run with the
/// expiry scheduler disabled.
///
/// # Environment Variables
///
/// - `DOCWATCH_DATABASE_URL` or `DATABASE_URL` (optional): PostgreSQL connection URL
/// - `DOCWATCH_DATABASE_MAX_CONNECTIONS` (optional): pool size (default: 10)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, DocwatchError> {
        let url = env_string("DOCWATCH_DATABASE_URL").or_else(|| env_string("DATABASE_URL"));
        let max_connections = parse_env_var(
            "DOCWATCH_DATABASE_MAX_CONNECTIONS",
            DatabaseConfig::default().max_connections,
        )?;

        Ok(Self {
            url,
            max_connections,
        })
    }

    fn validate(&self) -> Result<(), DocwatchError> {
        if let Some(url) = &self.url {
            Url::parse(url).map_err(|e| {
                DocwatchError::configuration(
                    format!("Invalid DATABASE_URL: {}", e),
                    "DOCWATCH_DATABASE_URL",
                )
            })?;
        }

        if self.max_connections == 0 {
            return Err(DocwatchError::configuration(
                "max_connections must be greater than 0",
                "DOCWATCH_DATABASE_MAX_CONNECTIONS",
            ));
        }

        Ok(())
    }
}

/// Read a variable, treating unset and blank values alike.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// # Errors
///
/// Returns a `ConfigurationError` if the value cannot be parsed
pub fn parse_env_var<T>(key: &str, default: T) -> Result<T, DocwatchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|v| {
            v.parse::<T>().map_err(|e| {
                DocwatchError::configuration(format!("Failed to parse {}: {}", key, e), key)
            })
        })
        .unwrap_or(Ok(default))
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn parse_env_bool(key: &str, default: bool) -> Result<bool, DocwatchError> {
    match env_string(key) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(DocwatchError::configuration(
                format!("Failed to parse {}: '{}' is not a boolean", key, other),
                key,
            )),
        },
    }
}

/// Load .env file if present
///
/// Does not fail when the file is missing.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    /// Serializes tests that mutate process environment.
    pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_service_key_matches_exact_bytes() {
        let key = ServiceKey::new("s3cret-key").unwrap();
        assert!(key.matches("s3cret-key"));
        assert!(!key.matches("s3cret-kez"));
        assert!(!key.matches("s3cret-key "));
        assert!(!key.matches(""));
    }

    #[test]
    fn test_service_key_is_redacted() {
        let key = ServiceKey::new("super-secret").unwrap();
        assert_eq!(format!("{}", key), "****");
        assert!(!format!("{:?}", key).contains("super-secret"));
    }

    #[test]
    fn test_empty_service_key_rejected() {
        assert!(ServiceKey::new("").is_err());
    }

    #[test]
    fn test_auth_config_requires_key() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("DOCWATCH_SERVICE_KEY");

        let result = AuthConfig::from_env();
        assert!(matches!(
            result,
            Err(DocwatchError::ConfigurationError { .. })
        ));

        env::set_var("DOCWATCH_SERVICE_KEY", "abc");
        let config = AuthConfig::from_env().unwrap();
        assert!(config.service_key.matches("abc"));
        env::remove_var("DOCWATCH_SERVICE_KEY");
    }

    #[test]
    fn test_rpc_server_config_default() {
        let config = RpcServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9090);
        assert!(config.tls.enabled);
        assert_eq!(config.bind_address(), "0.0.0.0:9090");
    }

    #[test]
    fn test_rpc_server_config_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DOCWATCH_RPC_HOST", "127.0.0.1");
        env::set_var("DOCWATCH_RPC_PORT", "7000");
        env::set_var("DOCWATCH_RPC_TLS_ENABLED", "false");

        let config = RpcServerConfig::from_env().unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 7000);
        assert!(!config.tls.enabled);

        env::remove_var("DOCWATCH_RPC_HOST");
        env::remove_var("DOCWATCH_RPC_PORT");
        env::remove_var("DOCWATCH_RPC_TLS_ENABLED");
    }

    #[test]
    fn test_rpc_server_config_validation_zero_port() {
        let mut config = RpcServerConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rpc_server_config_validation_tls_without_cert() {
        let mut config = RpcServerConfig::default();
        config.tls.cert_file = PathBuf::new();
        assert!(config.validate().is_err());

        config.tls.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_invalid_url() {
        let config = DatabaseConfig {
            url: Some("not a url".to_string()),
            max_connections: 5,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_config_url_is_optional() {
        assert!(DatabaseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_env_var_with_default() {
        let result: u32 = parse_env_var("DOCWATCH_TEST_NON_EXISTENT_VAR", 42).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn test_parse_env_var_invalid_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DOCWATCH_TEST_INVALID_VAR", "not-a-number");
        let result: Result<u32, _> = parse_env_var("DOCWATCH_TEST_INVALID_VAR", 42);
        assert!(result.is_err());
        env::remove_var("DOCWATCH_TEST_INVALID_VAR");
    }

    #[test]
    fn test_parse_env_bool_variants() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DOCWATCH_TEST_BOOL", "Yes");
        assert!(parse_env_bool("DOCWATCH_TEST_BOOL", false).unwrap());
        env::set_var("DOCWATCH_TEST_BOOL", "0");
        assert!(!parse_env_bool("DOCWATCH_TEST_BOOL", true).unwrap());
        env::set_var("DOCWATCH_TEST_BOOL", "maybe");
        assert!(parse_env_bool("DOCWATCH_TEST_BOOL", true).is_err());
        env::remove_var("DOCWATCH_TEST_BOOL");
        assert!(parse_env_bool("DOCWATCH_TEST_BOOL", true).unwrap());
    }
}
