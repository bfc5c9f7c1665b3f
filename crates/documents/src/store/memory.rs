use super::{expiring_cutoff, DocumentStore};
use crate::error::{DocumentError, Result};
use crate::models::{Document, DocumentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Failures {
    queries: Option<String>,
    marks: Option<String>,
    /// Queries left to succeed before the next one fails once.
    scheduled_query: Option<(usize, String)>,
}

/// Document store held in memory, ordered by id.
///
/// Used for database-less development and tests. Query and flag-update
/// failures can be injected with [`fail_queries`](Self::fail_queries),
/// [`fail_query_after`](Self::fail_query_after) and
/// [`fail_marks`](Self::fail_marks).
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<i64, Document>>,
    failures: RwLock<Failures>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        for doc in documents {
            store.insert(doc);
        }
        store
    }

    pub fn insert(&self, doc: Document) {
        if let Ok(mut documents) = self.documents.write() {
            documents.insert(doc.id, doc);
        }
    }

    pub fn get(&self, id: i64) -> Option<Document> {
        self.documents
            .read()
            .ok()
            .and_then(|documents| documents.get(&id).cloned())
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make `find_*` calls fail with `reason` (or succeed again with `None`).
    pub fn fail_queries(&self, reason: Option<String>) {
        if let Ok(mut failures) = self.failures.write() {
            failures.queries = reason;
        }
    }

    /// Let the next `successes` `find_*` calls through, then fail exactly one
    /// with `reason`.
    pub fn fail_query_after(&self, successes: usize, reason: impl Into<String>) {
        if let Ok(mut failures) = self.failures.write() {
            failures.scheduled_query = Some((successes, reason.into()));
        }
    }

    /// Make `mark_*` calls fail with `reason` (or succeed again with `None`).
    pub fn fail_marks(&self, reason: Option<String>) {
        if let Ok(mut failures) = self.failures.write() {
            failures.marks = reason;
        }
    }

    fn check_query(&self) -> Result<()> {
        let mut failures = self
            .failures
            .write()
            .map_err(|_| DocumentError::Persistence("failure hooks poisoned".to_string()))?;

        if let Some(reason) = failures.queries.clone() {
            return Err(DocumentError::Persistence(reason));
        }

        match failures.scheduled_query.take() {
            Some((0, reason)) => Err(DocumentError::Persistence(reason)),
            Some((remaining, reason)) => {
                failures.scheduled_query = Some((remaining - 1, reason));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check_mark(&self) -> Result<()> {
        match self.failures.read().ok().and_then(|f| f.marks.clone()) {
            Some(reason) => Err(DocumentError::Persistence(reason)),
            None => Ok(()),
        }
    }

    fn select(&self, predicate: impl Fn(&Document) -> bool) -> Result<Vec<Document>> {
        self.check_query()?;
        let documents = self
            .documents
            .read()
            .map_err(|_| DocumentError::Persistence("document store poisoned".to_string()))?;
        Ok(documents.values().filter(|d| predicate(d)).cloned().collect())
    }

    fn update(&self, id: i64, apply: impl FnOnce(&mut Document)) -> Result<()> {
        self.check_mark()?;
        let mut documents = self
            .documents
            .write()
            .map_err(|_| DocumentError::Persistence("document store poisoned".to_string()))?;
        match documents.get_mut(&id) {
            Some(doc) => {
                apply(doc);
                Ok(())
            }
            None => Err(DocumentError::Persistence(format!("document {} not found", id))),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_expiring(&self, threshold_days: i64, now: DateTime<Utc>) -> Result<Vec<Document>> {
        let threshold = expiring_cutoff(now, threshold_days)?;
        self.select(|d| {
            d.status == DocumentStatus::Active
                && !d.notification_sent
                && d.expiry_date
                    .map(|e| e > now && e <= threshold)
                    .unwrap_or(false)
        })
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Document>> {
        self.select(|d| {
            d.status == DocumentStatus::Active && d.expiry_date.map(|e| e <= now).unwrap_or(false)
        })
    }

    async fn mark_notified(&self, id: i64) -> Result<()> {
        self.update(id, |doc| doc.notification_sent = true)
    }

    async fn mark_expired_notified(&self, id: i64) -> Result<()> {
        self.update(id, |doc| doc.expired_notification_sent = true)
    }
}
