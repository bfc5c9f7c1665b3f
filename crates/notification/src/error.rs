use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use docwatch_core::DocwatchError;

pub type Result<T> = std::result::Result<T, NotificationError>;

/// Failure reported by a delivery backend.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),

    #[error("Delivery provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Payload error: {0}")]
    Payload(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    pub fn required(field: &str) -> Self {
        NotificationError::Validation {
            field: field.to_string(),
            message: format!("{} is required", field),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            NotificationError::Validation { .. } => "invalid_argument",
            NotificationError::Delivery(_) => "delivery_failed",
            NotificationError::Unauthenticated(_) => "unauthenticated",
            NotificationError::Configuration(_) => "configuration_error",
            NotificationError::Internal(_) => "internal",
        }
    }
}

impl From<DocwatchError> for NotificationError {
    fn from(err: DocwatchError) -> Self {
        match err {
            DocwatchError::ConfigurationError { message, .. } => {
                NotificationError::Configuration(message)
            }
            other => NotificationError::Internal(other.to_string()),
        }
    }
}

impl ResponseError for NotificationError {
    fn status_code(&self) -> StatusCode {
        match self {
            NotificationError::Validation { .. } => StatusCode::BAD_REQUEST,
            NotificationError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            NotificationError::Delivery(_) => StatusCode::BAD_GATEWAY,
            NotificationError::Configuration(_) | NotificationError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            NotificationError::Configuration(_) | NotificationError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.code(),
            "message": message,
        }))
    }
}
