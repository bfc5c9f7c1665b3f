//! Pluggable delivery backends
//!
//! A backend transmits one rendered notification to one recipient. The
//! notification service never talks to a provider directly; it is handed an
//! `Arc<dyn DeliveryBackend>` built by [`crate::factory::build_backend`].

pub mod providers;

pub use providers::{ConsoleBackend, DeliveryRecord, EmailBackend, MockBackend};

use crate::error::DeliveryError;
use async_trait::async_trait;
use docwatch_core::config::{env_string, parse_env_var};
use docwatch_core::{ConfigLoader, DocwatchError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[async_trait]
pub trait DeliveryBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        payload: &serde_json::Value,
    ) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryBackendKind {
    Email,
    Console,
    Mock,
}

impl DeliveryBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryBackendKind::Email => "email",
            DeliveryBackendKind::Console => "console",
            DeliveryBackendKind::Mock => "mock",
        }
    }
}

impl fmt::Display for DeliveryBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryBackendKind {
    type Err = DocwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(DeliveryBackendKind::Email),
            "console" => Ok(DeliveryBackendKind::Console),
            "mock" => Ok(DeliveryBackendKind::Mock),
            other => Err(DocwatchError::configuration(
                format!("unknown notification provider: {}", other),
                "DOCWATCH_DELIVERY_BACKEND",
            )),
        }
    }
}

/// Delivery backend configuration
///
/// # Environment Variables
///
/// - `DOCWATCH_DELIVERY_BACKEND` (optional): "email", "console" or "mock" (default: "email")
/// - `DOCWATCH_EMAIL_API_KEY` (required for "email"): SendGrid API key
/// - `DOCWATCH_EMAIL_API_URL` (optional): SendGrid endpoint override
/// - `DOCWATCH_EMAIL_FROM` (optional): sender address (default: "noreply@docwatch.local")
/// - `DOCWATCH_EMAIL_FROM_NAME` (optional): sender display name (default: "Docwatch")
/// - `DOCWATCH_EMAIL_TIMEOUT_SECS` (optional): provider request timeout (default: 10)
#[derive(Clone)]
pub struct DeliveryConfig {
    pub backend: DeliveryBackendKind,
    pub email_api_key: Option<String>,
    pub email_api_url: String,
    pub from_email: String,
    pub from_name: String,
    pub request_timeout: Duration,
}

impl fmt::Debug for DeliveryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryConfig")
            .field("backend", &self.backend)
            .field("email_api_key", &self.email_api_key.as_ref().map(|_| "****"))
            .field("email_api_url", &self.email_api_url)
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            backend: DeliveryBackendKind::Email,
            email_api_key: None,
            email_api_url: SENDGRID_API_URL.to_string(),
            from_email: "noreply@docwatch.local".to_string(),
            from_name: "Docwatch".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl DeliveryConfig {
    pub fn with_backend(backend: DeliveryBackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }
}

impl ConfigLoader for DeliveryConfig {
    fn from_env() -> Result<Self, DocwatchError> {
        let defaults = Self::default();

        let backend = match env_string("DOCWATCH_DELIVERY_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.backend,
        };

        Ok(Self {
            backend,
            email_api_key: env_string("DOCWATCH_EMAIL_API_KEY"),
            email_api_url: env_string("DOCWATCH_EMAIL_API_URL").unwrap_or(defaults.email_api_url),
            from_email: env_string("DOCWATCH_EMAIL_FROM").unwrap_or(defaults.from_email),
            from_name: env_string("DOCWATCH_EMAIL_FROM_NAME").unwrap_or(defaults.from_name),
            request_timeout: Duration::from_secs(parse_env_var(
                "DOCWATCH_EMAIL_TIMEOUT_SECS",
                10u64,
            )?),
        })
    }

    fn validate(&self) -> Result<(), DocwatchError> {
        if self.backend == DeliveryBackendKind::Email {
            if self.email_api_key.is_none() {
                return Err(DocwatchError::configuration(
                    "DOCWATCH_EMAIL_API_KEY is required for the email delivery backend",
                    "DOCWATCH_EMAIL_API_KEY",
                ));
            }

            url::Url::parse(&self.email_api_url).map_err(|e| {
                DocwatchError::configuration(
                    format!("Invalid email API URL: {}", e),
                    "DOCWATCH_EMAIL_API_URL",
                )
            })?;
        }

        if self.from_email.trim().is_empty() {
            return Err(DocwatchError::configuration(
                "sender address must not be empty",
                "DOCWATCH_EMAIL_FROM",
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(DocwatchError::configuration(
                "email request timeout must be greater than 0",
                "DOCWATCH_EMAIL_TIMEOUT_SECS",
            ));
        }

        Ok(())
    }
}
