//! Where expiry notifications go
//!
//! The scheduler only needs "send this request"; whether that is an RPC to a
//! remote notification service or a direct call into an in-process
//! [`NotificationService`] is decided in `main`.

use crate::error::{DocumentError, Result};
use async_trait::async_trait;
use docwatch_notification::{
    DocumentExpiryRequest, NotificationClient, NotificationError, NotificationService,
};

#[async_trait]
pub trait ExpiryNotifier: Send + Sync {
    async fn notify_document_expiry(&self, request: &DocumentExpiryRequest) -> Result<()>;
}

#[async_trait]
impl ExpiryNotifier for NotificationClient {
    async fn notify_document_expiry(&self, request: &DocumentExpiryRequest) -> Result<()> {
        NotificationClient::notify_document_expiry(self, request)
            .await
            .map(|_| ())
            .map_err(|e| DocumentError::dispatch(e.to_string(), e.is_retriable()))
    }
}

#[async_trait]
impl ExpiryNotifier for NotificationService {
    async fn notify_document_expiry(&self, request: &DocumentExpiryRequest) -> Result<()> {
        NotificationService::notify_document_expiry(self, request)
            .await
            .map_err(|e| {
                let retriable = matches!(
                    e,
                    NotificationError::Delivery(_) | NotificationError::Internal(_)
                );
                DocumentError::dispatch(e.to_string(), retriable)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwatch_notification::MockBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_local_service_as_notifier() {
        let backend = Arc::new(MockBackend::new());
        let notifier: Arc<dyn ExpiryNotifier> = Arc::new(NotificationService::new(backend.clone()));

        let request = DocumentExpiryRequest {
            user_uuid: "5a1d3c0e-2f4b-4c6d-8e9f-0a1b2c3d4e5f".to_string(),
            email: "owner@example.com".to_string(),
            document_name: "Warranty Card".to_string(),
            document_category: "warranty".to_string(),
            ..DocumentExpiryRequest::default()
        };
        notifier.notify_document_expiry(&request).await.unwrap();
        assert_eq!(backend.attempt_count(), 1);

        let invalid = DocumentExpiryRequest::default();
        let err = notifier.notify_document_expiry(&invalid).await.unwrap_err();
        assert!(matches!(err, DocumentError::Dispatch { retriable: false, .. }));

        backend.set_failure(Some("smtp relay down".to_string()));
        let err = notifier.notify_document_expiry(&request).await.unwrap_err();
        assert!(err.is_retriable());
    }
}
