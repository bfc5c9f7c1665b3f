//! # Docwatch Documents
//!
//! The document-expiry notification pipeline: find documents approaching or
//! past their expiry date and relay notifications to the notification
//! service, tracking what has already been sent.

pub mod dispatcher;
pub mod error;
pub mod models;
pub mod notifier;
pub mod scheduler;
pub mod store;

pub use dispatcher::{
    build_expired_request, build_expiring_request, build_request, classify, days_until_expiry,
    ExpiryClassification,
};
pub use error::{DocumentError, Result};
pub use models::{Document, DocumentCategory, DocumentStatus};
pub use notifier::ExpiryNotifier;
pub use scheduler::{CycleReport, ExpiredNotificationPolicy, ExpiryScheduler, SchedulerConfig};
pub use store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};
