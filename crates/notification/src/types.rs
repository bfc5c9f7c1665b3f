//! Request and response messages exchanged over the notification RPC.

use crate::error::{NotificationError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCreatedRequest {
    #[serde(default)]
    pub user_uuid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
}

impl UserCreatedRequest {
    pub fn validate(&self) -> Result<()> {
        require("user_uuid", &self.user_uuid)?;
        require("email", &self.email)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentExpiryRequest {
    #[serde(default)]
    pub user_uuid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub document_name: String,
    #[serde(default)]
    pub document_category: String,
    /// RFC 3339 timestamp; absent when the document has no expiry date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub days_until_expiry: i64,
    #[serde(default)]
    pub is_expired: bool,
    #[serde(default)]
    pub message: String,
}

impl DocumentExpiryRequest {
    pub fn validate(&self) -> Result<()> {
        require("user_uuid", &self.user_uuid)?;
        require("email", &self.email)?;
        require("document_name", &self.document_name)
    }

    pub fn subject(&self) -> String {
        if self.is_expired {
            format!("Document Expired: {}", self.document_name)
        } else {
            format!("Document Expiring Soon: {}", self.document_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl NotificationResponse {
    pub fn sent(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(NotificationError::required(field));
    }
    Ok(())
}
