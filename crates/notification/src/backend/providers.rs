use super::{DeliveryBackend, DeliveryConfig};
use crate::error::DeliveryError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use tracing::{debug, info};

/// Plain-text body for a notification payload: its `message` field when
/// present, otherwise the payload itself pretty-printed.
pub fn render_text(payload: &Value) -> Result<String, DeliveryError> {
    match payload.get("message").and_then(Value::as_str) {
        Some(message) if !message.is_empty() => Ok(message.to_string()),
        _ => serde_json::to_string_pretty(payload).map_err(|e| DeliveryError::Payload(e.to_string())),
    }
}

pub struct EmailBackend {
    api_key: String,
    api_url: String,
    from_email: String,
    from_name: String,
    client: reqwest::Client,
}

impl EmailBackend {
    pub fn new(
        api_key: String,
        api_url: String,
        from_email: String,
        from_name: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            api_key,
            api_url,
            from_email,
            from_name,
            client,
        }
    }

    pub fn from_config(config: &DeliveryConfig, api_key: String) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        Ok(Self::new(
            api_key,
            config.email_api_url.clone(),
            config.from_email.clone(),
            config.from_name.clone(),
            client,
        ))
    }
}

#[async_trait]
impl DeliveryBackend for EmailBackend {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, recipient: &str, subject: &str, payload: &Value) -> Result<(), DeliveryError> {
        let body = json!({
            "personalizations": [{
                "to": [{"email": recipient}],
                "subject": subject
            }],
            "from": {
                "email": self.from_email,
                "name": self.from_name
            },
            "content": [{
                "type": "text/plain",
                "value": render_text(payload)?
            }]
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(recipient = %recipient, status = status.as_u16(), "Email accepted by provider");
            Ok(())
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Development backend: writes each notification to the log.
#[derive(Debug, Default)]
pub struct ConsoleBackend;

impl ConsoleBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeliveryBackend for ConsoleBackend {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn send(&self, recipient: &str, subject: &str, payload: &Value) -> Result<(), DeliveryError> {
        let body = render_text(payload)?;
        info!(
            recipient = %recipient,
            subject = %subject,
            body = %body,
            "Notification delivered (console backend)"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub recipient: String,
    pub subject: String,
    pub payload: Value,
}

/// In-memory backend that records every delivery attempt.
#[derive(Debug, Default)]
pub struct MockBackend {
    attempts: Mutex<Vec<DeliveryRecord>>,
    failure: Mutex<Option<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        let backend = Self::new();
        backend.set_failure(Some(reason.into()));
        backend
    }

    /// Make subsequent sends fail with `reason`, or succeed again with `None`.
    pub fn set_failure(&self, reason: Option<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = reason;
        }
    }

    pub fn attempts(&self) -> Vec<DeliveryRecord> {
        self.attempts
            .lock()
            .map(|attempts| attempts.clone())
            .unwrap_or_default()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().map(|attempts| attempts.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DeliveryBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, recipient: &str, subject: &str, payload: &Value) -> Result<(), DeliveryError> {
        self.attempts
            .lock()
            .map_err(|_| DeliveryError::SendFailed("mock backend poisoned".to_string()))?
            .push(DeliveryRecord {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                payload: payload.clone(),
            });

        let failure = self
            .failure
            .lock()
            .map_err(|_| DeliveryError::SendFailed("mock backend poisoned".to_string()))?
            .clone();

        match failure {
            Some(reason) => Err(DeliveryError::SendFailed(reason)),
            None => Ok(()),
        }
    }
}
