//! Builds the configured delivery backend.

use crate::backend::{
    ConsoleBackend, DeliveryBackend, DeliveryBackendKind, DeliveryConfig, EmailBackend,
    MockBackend,
};
use crate::error::{NotificationError, Result};
use docwatch_core::ConfigLoader;
use std::sync::Arc;
use tracing::{info, warn};

pub fn build_backend(config: &DeliveryConfig) -> Result<Arc<dyn DeliveryBackend>> {
    config.validate()?;

    let backend: Arc<dyn DeliveryBackend> = match config.backend {
        DeliveryBackendKind::Email => {
            let api_key = config.email_api_key.clone().ok_or_else(|| {
                NotificationError::Configuration(
                    "DOCWATCH_EMAIL_API_KEY is required for the email delivery backend".to_string(),
                )
            })?;
            let backend = EmailBackend::from_config(config, api_key)
                .map_err(|e| NotificationError::Configuration(e.to_string()))?;
            Arc::new(backend)
        }
        DeliveryBackendKind::Console => Arc::new(ConsoleBackend::new()),
        DeliveryBackendKind::Mock => {
            warn!("Mock delivery backend selected; notifications are recorded, not delivered");
            Arc::new(MockBackend::new())
        }
    };

    info!(backend = %config.backend, "Delivery backend initialized");
    Ok(backend)
}
