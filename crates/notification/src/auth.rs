//! Service-key authentication for inbound RPC calls

use crate::error::NotificationError;
use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderMap,
    Error, ResponseError,
};
use docwatch_core::ServiceKey;
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    task::{Context, Poll},
};
use tracing::warn;

pub const SERVICE_KEY_HEADER: &str = "x-service-key";

pub const MISSING_KEY_MESSAGE: &str = "service key is missing in request metadata";
pub const INVALID_KEY_MESSAGE: &str = "invalid service key";

/// Check the service key header against the configured secret.
pub fn check_service_key(headers: &HeaderMap, expected: &ServiceKey) -> Result<(), NotificationError> {
    let value = match headers.get(SERVICE_KEY_HEADER) {
        None => return Err(NotificationError::Unauthenticated(MISSING_KEY_MESSAGE.to_string())),
        Some(value) if value.is_empty() => {
            return Err(NotificationError::Unauthenticated(MISSING_KEY_MESSAGE.to_string()))
        }
        Some(value) => value,
    };

    let candidate = value
        .to_str()
        .map_err(|_| NotificationError::Unauthenticated(INVALID_KEY_MESSAGE.to_string()))?;

    if expected.matches(candidate) {
        Ok(())
    } else {
        Err(NotificationError::Unauthenticated(INVALID_KEY_MESSAGE.to_string()))
    }
}

/// Rejects requests that do not carry the shared service key, before they
/// reach a handler.
pub struct ServiceKeyAuth {
    key: Rc<ServiceKey>,
}

impl ServiceKeyAuth {
    pub fn new(key: ServiceKey) -> Self {
        Self { key: Rc::new(key) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ServiceKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ServiceKeyAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ServiceKeyAuthService {
            service: Rc::new(service),
            key: self.key.clone(),
        }))
    }
}

pub struct ServiceKeyAuthService<S> {
    service: Rc<S>,
    key: Rc<ServiceKey>,
}

impl<S, B> Service<ServiceRequest> for ServiceKeyAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if let Err(e) = check_service_key(req.headers(), &self.key) {
            warn!(
                path = %req.path(),
                peer = ?req.peer_addr(),
                reason = %e,
                "Rejected unauthenticated RPC call"
            );
            let response = e.error_response().map_into_right_body();
            return Box::pin(async move { Ok(req.into_response(response)) });
        }

        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn key() -> ServiceKey {
        ServiceKey::new("s3cret-key").unwrap()
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(SERVICE_KEY_HEADER),
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_missing_header() {
        let err = check_service_key(&HeaderMap::new(), &key()).unwrap_err();
        assert_eq!(err.to_string(), MISSING_KEY_MESSAGE);
    }

    #[test]
    fn test_empty_header_counts_as_missing() {
        let err = check_service_key(&headers_with(""), &key()).unwrap_err();
        assert_eq!(err.to_string(), MISSING_KEY_MESSAGE);
    }

    #[test]
    fn test_wrong_key() {
        let err = check_service_key(&headers_with("s3cret-kez"), &key()).unwrap_err();
        assert_eq!(err.to_string(), INVALID_KEY_MESSAGE);

        let err = check_service_key(&headers_with("s3cret"), &key()).unwrap_err();
        assert_eq!(err.to_string(), INVALID_KEY_MESSAGE);
    }

    #[test]
    fn test_correct_key() {
        assert!(check_service_key(&headers_with("s3cret-key"), &key()).is_ok());
    }
}
