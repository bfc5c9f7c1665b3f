//! Expiry classification and notification request construction
//!
//! Everything here is a pure function of a [`Document`] and a reference time:
//! no I/O, no clock reads. The scheduler decides *when* to call these; this
//! module decides *what* is sent.

use crate::models::{Document, DocumentStatus};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use docwatch_notification::DocumentExpiryRequest;

pub const DEFAULT_THRESHOLD_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryClassification {
    pub days_until_expiry: i64,
    pub status: DocumentStatus,
}

/// Whole days from `now` until `expiry`.
///
/// Computed from whole hours divided by 24 and truncated toward zero, so 23
/// hours is 0 days, 49 hours is 2 days and 5 days ago is -5.
pub fn days_until_expiry(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiry - now).num_hours() / 24
}

/// Upper edge of the expiring-soon window, `now + threshold_days`.
///
/// `None` when the result does not fit in a `DateTime<Utc>`.
pub fn threshold_cutoff(now: DateTime<Utc>, threshold_days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(threshold_days).and_then(|window| now.checked_add_signed(window))
}

/// Classify a document's expiry relative to `now`.
///
/// Expiring means `now < expiry <= now + threshold_days`, the same window the
/// stores query. A missing expiry date is always `Active`.
pub fn classify(
    expiry: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> ExpiryClassification {
    let Some(expiry) = expiry else {
        return ExpiryClassification {
            days_until_expiry: 0,
            status: DocumentStatus::Active,
        };
    };

    let days = days_until_expiry(expiry, now);
    let status = if expiry <= now {
        DocumentStatus::Expired
    } else if threshold_cutoff(now, threshold_days).map_or(true, |cutoff| expiry <= cutoff) {
        DocumentStatus::Expiring
    } else {
        DocumentStatus::Active
    };

    ExpiryClassification {
        days_until_expiry: days,
        status,
    }
}

fn display_date(expiry: Option<DateTime<Utc>>) -> String {
    expiry
        .map(|e| e.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "an unknown date".to_string())
}

fn base_request(doc: &Document, now: DateTime<Utc>) -> DocumentExpiryRequest {
    DocumentExpiryRequest {
        user_uuid: doc.user_uuid.to_string(),
        email: doc.owner_email.clone().unwrap_or_default(),
        document_name: doc.name.clone(),
        document_category: doc.category.to_string(),
        expiry_date: doc
            .expiry_date
            .map(|e| e.to_rfc3339_opts(SecondsFormat::Secs, true)),
        days_until_expiry: doc
            .expiry_date
            .map(|e| days_until_expiry(e, now))
            .unwrap_or(0),
        is_expired: false,
        message: String::new(),
    }
}

/// Request for a document that expires within the threshold window.
pub fn build_expiring_request(doc: &Document, now: DateTime<Utc>) -> DocumentExpiryRequest {
    let mut request = base_request(doc, now);
    request.message = format!(
        "Your document '{}' (Category: {}) will expire in {} days on {}. Please renew it soon.",
        doc.name,
        doc.category,
        request.days_until_expiry,
        display_date(doc.expiry_date)
    );
    request
}

/// Request for a document whose expiry date has passed.
pub fn build_expired_request(doc: &Document, now: DateTime<Utc>) -> DocumentExpiryRequest {
    let mut request = base_request(doc, now);
    request.is_expired = true;
    request.message = format!(
        "Your document '{}' (Category: {}) has expired on {}. Please renew it immediately.",
        doc.name,
        doc.category,
        display_date(doc.expiry_date)
    );
    request
}

/// Build whichever request the document's classification calls for.
///
/// Returns `None` for documents that need no notification.
pub fn build_request(
    doc: &Document,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> Option<DocumentExpiryRequest> {
    match classify(doc.expiry_date, now, threshold_days).status {
        DocumentStatus::Expired => Some(build_expired_request(doc, now)),
        DocumentStatus::Expiring => Some(build_expiring_request(doc, now)),
        DocumentStatus::Active => None,
    }
}
