//! Document persistence seen from the expiry pipeline
//!
//! The pipeline reads candidate documents and flips notification flags; it
//! never creates, edits or deletes documents.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

use crate::dispatcher::threshold_cutoff;
use crate::error::{DocumentError, Result};
use crate::models::Document;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Active documents with `now < expiry <= now + threshold_days` that have
    /// not been notified yet.
    async fn find_expiring(&self, threshold_days: i64, now: DateTime<Utc>) -> Result<Vec<Document>>;

    /// Active documents with `expiry <= now`, whatever their notified flag.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Document>>;

    /// Set `notification_sent`. Idempotent.
    async fn mark_notified(&self, id: i64) -> Result<()>;

    /// Set `expired_notification_sent`. Idempotent.
    async fn mark_expired_notified(&self, id: i64) -> Result<()>;
}

/// `now + threshold_days`, or a configuration error when it overflows.
pub(crate) fn expiring_cutoff(now: DateTime<Utc>, threshold_days: i64) -> Result<DateTime<Utc>> {
    threshold_cutoff(now, threshold_days).ok_or_else(|| {
        DocumentError::Configuration(format!(
            "expiry threshold of {} days is out of range",
            threshold_days
        ))
    })
}
