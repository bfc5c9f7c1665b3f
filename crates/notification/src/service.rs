use crate::backend::{DeliveryBackend, DeliveryConfig};
use crate::error::Result;
use crate::factory::build_backend;
use crate::types::{DocumentExpiryRequest, UserCreatedRequest};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};

pub const WELCOME_SUBJECT: &str = "Welcome to our platform!";

/// Turns notification requests into deliveries on a single backend.
///
/// Requests are validated before the backend is touched. Delivery failures
/// are returned to the caller as-is; the service never retries.
#[derive(Clone)]
pub struct NotificationService {
    backend: Arc<dyn DeliveryBackend>,
}

impl NotificationService {
    pub fn new(backend: Arc<dyn DeliveryBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &DeliveryConfig) -> Result<Self> {
        Ok(Self::new(build_backend(config)?))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    #[instrument(skip(self, request), fields(user_uuid = %request.user_uuid))]
    pub async fn notify_user_created(&self, request: &UserCreatedRequest) -> Result<()> {
        request.validate()?;

        let payload = json!({
            "type": "user_created",
            "user_uuid": request.user_uuid,
            "email": request.email,
            "username": request.username,
        });

        self.backend
            .send(&request.email, WELCOME_SUBJECT, &payload)
            .await
            .map_err(|e| {
                error!(error = %e, backend = self.backend.name(), "Failed to send welcome notification");
                e
            })?;

        info!(recipient = %request.email, "Welcome notification sent");
        Ok(())
    }

    #[instrument(skip(self, request), fields(user_uuid = %request.user_uuid, document = %request.document_name))]
    pub async fn notify_document_expiry(&self, request: &DocumentExpiryRequest) -> Result<()> {
        request.validate()?;

        let payload = json!({
            "type": "document_expiry",
            "user_uuid": request.user_uuid,
            "email": request.email,
            "document_name": request.document_name,
            "document_category": request.document_category,
            "expiry_date": request.expiry_date,
            "days_until_expiry": request.days_until_expiry,
            "is_expired": request.is_expired,
            "message": request.message,
        });

        self.backend
            .send(&request.email, &request.subject(), &payload)
            .await
            .map_err(|e| {
                error!(error = %e, backend = self.backend.name(), "Failed to send document expiry notification");
                e
            })?;

        info!(
            recipient = %request.email,
            is_expired = request.is_expired,
            days_until_expiry = request.days_until_expiry,
            "Document expiry notification sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::error::NotificationError;

    fn service_with_mock() -> (NotificationService, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::new());
        (NotificationService::new(backend.clone()), backend)
    }

    fn expiring_request() -> DocumentExpiryRequest {
        DocumentExpiryRequest {
            user_uuid: "3f0c2a4e-4b8e-4f63-9d1c-2b7f0f1f9a10".to_string(),
            email: "owner@example.com".to_string(),
            document_name: "Driving License".to_string(),
            document_category: "license".to_string(),
            expiry_date: Some("2026-05-01T00:00:00+00:00".to_string()),
            days_until_expiry: 12,
            is_expired: false,
            message: "Your document 'Driving License' (Category: license) will expire in 12 days on 2026-05-01. Please renew it soon.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_document_expiry_payload_and_subject() {
        let (service, backend) = service_with_mock();
        service
            .notify_document_expiry(&expiring_request())
            .await
            .unwrap();

        let attempts = backend.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].recipient, "owner@example.com");
        assert_eq!(attempts[0].subject, "Document Expiring Soon: Driving License");
        assert_eq!(attempts[0].payload["type"], "document_expiry");
        assert_eq!(attempts[0].payload["days_until_expiry"], 12);
        assert_eq!(attempts[0].payload["document_category"], "license");
    }

    #[tokio::test]
    async fn test_expired_subject() {
        let (service, backend) = service_with_mock();
        let mut request = expiring_request();
        request.is_expired = true;
        request.days_until_expiry = -5;

        service.notify_document_expiry(&request).await.unwrap();
        assert_eq!(backend.attempts()[0].subject, "Document Expired: Driving License");
    }

    #[tokio::test]
    async fn test_validation_happens_before_backend() {
        let (service, backend) = service_with_mock();
        let mut request = expiring_request();
        request.user_uuid.clear();

        let err = service.notify_document_expiry(&request).await.unwrap_err();
        assert!(matches!(err, NotificationError::Validation { .. }));
        assert_eq!(backend.attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_user_created_welcome() {
        let (service, backend) = service_with_mock();
        let request = UserCreatedRequest {
            user_uuid: "3f0c2a4e-4b8e-4f63-9d1c-2b7f0f1f9a10".to_string(),
            email: "new@example.com".to_string(),
            username: "newbie".to_string(),
        };

        service.notify_user_created(&request).await.unwrap();

        let attempts = backend.attempts();
        assert_eq!(attempts[0].subject, WELCOME_SUBJECT);
        assert_eq!(attempts[0].payload["username"], "newbie");
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_once() {
        let backend = Arc::new(MockBackend::failing("provider unavailable"));
        let service = NotificationService::new(backend.clone());

        let err = service
            .notify_document_expiry(&expiring_request())
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Delivery(_)));
        assert_eq!(backend.attempt_count(), 1);
    }
}
