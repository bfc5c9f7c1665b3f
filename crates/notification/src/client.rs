//! Authenticated client for the notification RPC
//!
//! One [`NotificationClient`] is created at startup and shared; it wraps a
//! pooled `reqwest::Client` and is cheap to clone. Every call carries the
//! service key in the `x-service-key` header.

use crate::auth::SERVICE_KEY_HEADER;
use crate::server::{NOTIFY_DOCUMENT_EXPIRY_PATH, NOTIFY_USER_CREATED_PATH};
use crate::types::{DocumentExpiryRequest, NotificationResponse, UserCreatedRequest};
use docwatch_core::config::{env_string, parse_env_bool, parse_env_var};
use docwatch_core::{ConfigLoader, DocwatchError, ServiceKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("notification service rejected the call ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    /// Whether the same call could succeed if attempted again later.
    pub fn is_retriable(&self) -> bool {
        match self {
            ClientError::Transport(_) | ClientError::Timeout(_) => true,
            ClientError::Rejected { status, .. } => *status >= 500,
            ClientError::Validation(_) | ClientError::Unauthenticated(_) => false,
        }
    }
}

/// Downstream notification service connection settings
///
/// # Environment Variables
///
/// - `DOCWATCH_NOTIFICATION_SERVICE_ADDR` (optional): base address; unset disables dispatch
/// - `DOCWATCH_NOTIFICATION_TLS_ENABLED` (optional): use https for scheme-less addresses (default: true)
/// - `DOCWATCH_NOTIFICATION_TIMEOUT_SECS` (optional): per-request timeout (default: 10)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub address: Option<String>,
    pub tls_enabled: bool,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: None,
            tls_enabled: true,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Resolve the base URL. `None` when no address is configured.
    ///
    /// An address without a scheme gets `https://` when TLS is enabled and
    /// `http://` otherwise.
    pub fn base_url(&self) -> Result<Option<Url>, DocwatchError> {
        let Some(address) = self.address.as_deref() else {
            return Ok(None);
        };

        let raw = if address.contains("://") {
            address.to_string()
        } else if self.tls_enabled {
            format!("https://{}", address)
        } else {
            format!("http://{}", address)
        };

        Url::parse(&raw).map(Some).map_err(|e| {
            DocwatchError::configuration(
                format!("Invalid notification service address '{}': {}", address, e),
                "DOCWATCH_NOTIFICATION_SERVICE_ADDR",
            )
        })
    }
}

impl ConfigLoader for ClientConfig {
    fn from_env() -> Result<Self, DocwatchError> {
        let defaults = Self::default();
        Ok(Self {
            address: env_string("DOCWATCH_NOTIFICATION_SERVICE_ADDR"),
            tls_enabled: parse_env_bool("DOCWATCH_NOTIFICATION_TLS_ENABLED", defaults.tls_enabled)?,
            request_timeout: Duration::from_secs(parse_env_var(
                "DOCWATCH_NOTIFICATION_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
        })
    }

    fn validate(&self) -> Result<(), DocwatchError> {
        if self.request_timeout.is_zero() {
            return Err(DocwatchError::configuration(
                "notification timeout must be greater than 0",
                "DOCWATCH_NOTIFICATION_TIMEOUT_SECS",
            ));
        }
        self.base_url()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct NotificationClient {
    http: reqwest::Client,
    base_url: Url,
    service_key: ServiceKey,
    request_timeout: Duration,
}

impl NotificationClient {
    pub fn new(
        base_url: Url,
        service_key: ServiceKey,
        request_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if base_url.scheme() != "https" {
            warn!(url = %base_url, "Notification client is not using TLS; service key is sent in cleartext");
        }

        Ok(Self {
            http,
            base_url,
            service_key,
            request_timeout,
        })
    }

    /// Build a client from configuration. Returns `Ok(None)` when no address
    /// is configured, which disables dispatch.
    pub fn from_config(
        config: &ClientConfig,
        service_key: ServiceKey,
    ) -> Result<Option<Self>, DocwatchError> {
        let Some(base_url) = config.base_url()? else {
            warn!("Notification service address not configured; notifications are disabled");
            return Ok(None);
        };

        let client = Self::new(base_url, service_key, config.request_timeout)
            .map_err(|e| DocwatchError::TransportError(e.to_string()))?;
        info!(url = %client.base_url, "Notification client configured");
        Ok(Some(client))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn notify_user_created(
        &self,
        request: &UserCreatedRequest,
    ) -> Result<NotificationResponse, ClientError> {
        request
            .validate()
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        self.call(NOTIFY_USER_CREATED_PATH, request).await
    }

    pub async fn notify_document_expiry(
        &self,
        request: &DocumentExpiryRequest,
    ) -> Result<NotificationResponse, ClientError> {
        request
            .validate()
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        self.call(NOTIFY_DOCUMENT_EXPIRY_PATH, request).await
    }

    async fn call<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<NotificationResponse, ClientError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::Transport(format!("invalid RPC url: {}", e)))?;

        debug!(url = %url, "Calling notification service");

        let response = self
            .http
            .post(url)
            .header(SERVICE_KEY_HEADER, self.service_key.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            let reply: NotificationResponse =
                response.json().await.map_err(|e| self.transport_error(e))?;
            if !reply.success {
                return Err(ClientError::Rejected {
                    status: status.as_u16(),
                    message: reply.message,
                });
            }
            return Ok(reply);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());

        if status == reqwest::StatusCode::UNAUTHORIZED {
            Err(ClientError::Unauthenticated(message))
        } else {
            Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.request_timeout)
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}
