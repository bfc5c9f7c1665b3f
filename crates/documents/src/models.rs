//! Document records as seen by the expiry pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Warranty,
    PollutionCertificate,
    Insurance,
    License,
    Other,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Warranty => "warranty",
            DocumentCategory::PollutionCertificate => "pollution_certificate",
            DocumentCategory::Insurance => "insurance",
            DocumentCategory::License => "license",
            DocumentCategory::Other => "other",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    /// Unknown categories map to `Other` so a new category in the database
    /// never stops a cycle.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "warranty" => DocumentCategory::Warranty,
            "pollution_certificate" => DocumentCategory::PollutionCertificate,
            "insurance" => DocumentCategory::Insurance,
            "license" => DocumentCategory::License,
            _ => DocumentCategory::Other,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Active,
    Expiring,
    Expired,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Active => "active",
            DocumentStatus::Expiring => "expiring",
            DocumentStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(DocumentStatus::Active),
            "expiring" => Ok(DocumentStatus::Expiring),
            "expired" => Ok(DocumentStatus::Expired),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub user_uuid: Uuid,
    pub name: String,
    pub category: DocumentCategory,
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: DocumentStatus,
    /// Set once an expiring-soon notification has been delivered.
    pub notification_sent: bool,
    /// Set once an expired notification has been delivered (`once` policy only).
    pub expired_notification_sent: bool,
    /// Owner's address, joined from the users table.
    pub owner_email: Option<String>,
}

impl Document {
    /// An active, un-notified document. Used by tests and fixtures.
    pub fn new(
        id: i64,
        user_uuid: Uuid,
        name: impl Into<String>,
        category: DocumentCategory,
        expiry_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            user_uuid,
            name: name.into(),
            category,
            issue_date: None,
            expiry_date,
            status: DocumentStatus::Active,
            notification_sent: false,
            expired_notification_sent: false,
            owner_email: None,
        }
    }

    pub fn with_owner_email(mut self, email: impl Into<String>) -> Self {
        self.owner_email = Some(email.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_strings() {
        assert_eq!(
            DocumentCategory::PollutionCertificate.to_string(),
            "pollution_certificate"
        );
        assert_eq!(
            "insurance".parse::<DocumentCategory>().unwrap(),
            DocumentCategory::Insurance
        );
        assert_eq!(
            "passport".parse::<DocumentCategory>().unwrap(),
            DocumentCategory::Other
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("active".parse::<DocumentStatus>().unwrap(), DocumentStatus::Active);
        assert!("archived".parse::<DocumentStatus>().is_err());
    }
}
