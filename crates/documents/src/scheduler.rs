//! Document Expiry Scheduler
//!
//! Once a day (by default at 09:00 local time) the scheduler scans the
//! document store and relays notifications:
//!
//! 1. documents expiring within the threshold window that have not been
//!    notified yet; each successful dispatch sets `notification_sent`
//! 2. documents whose expiry date has passed; under the default
//!    [`ExpiredNotificationPolicy::EveryCycle`] these are re-sent on every cycle
//!
//! A failed dispatch never stops the cycle: it is logged, counted in the
//! [`CycleReport`] and retried on the next cycle because its flag stays unset.

use crate::dispatcher::{self, threshold_cutoff, DEFAULT_THRESHOLD_DAYS};
use crate::error::{DocumentError, Result};
use crate::models::Document;
use crate::notifier::ExpiryNotifier;
use crate::store::DocumentStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docwatch_core::config::{env_string, parse_env_var};
use docwatch_core::schedule::{daily_at, parse_schedule};
use docwatch_core::{ConfigLoader, CronJob, CronScheduler, DocwatchError};
use docwatch_notification::DocumentExpiryRequest;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const EXPIRY_JOB_NAME: &str = "document-expiry";
pub const DEFAULT_SCHEDULE: &str = "0 0 9 * * *";

/// What to do with documents that stay expired across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiredNotificationPolicy {
    /// Notify every cycle for as long as the document stays active and expired.
    #[default]
    EveryCycle,
    /// Notify once, tracked by `expired_notification_sent`.
    Once,
}

impl fmt::Display for ExpiredNotificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiredNotificationPolicy::EveryCycle => f.write_str("every_cycle"),
            ExpiredNotificationPolicy::Once => f.write_str("once"),
        }
    }
}

impl FromStr for ExpiredNotificationPolicy {
    type Err = DocwatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "every_cycle" => Ok(ExpiredNotificationPolicy::EveryCycle),
            "once" => Ok(ExpiredNotificationPolicy::Once),
            other => Err(DocwatchError::configuration(
                format!("unknown expired notification policy: {}", other),
                "DOCWATCH_EXPIRED_POLICY",
            )),
        }
    }
}

/// Expiry scheduler configuration
///
/// # Environment Variables
///
/// - `DOCWATCH_EXPIRY_THRESHOLD_DAYS` (optional): expiring-soon window (default: 30)
/// - `DOCWATCH_EXPIRY_TRIGGER_TIME` (optional): daily trigger, HH:MM local (default: "09:00")
/// - `DOCWATCH_EXPIRY_SCHEDULE` (optional): cron expression, overrides the trigger time
/// - `DOCWATCH_EXPIRY_DISPATCH_TIMEOUT_SECS` (optional): per-dispatch timeout (default: 10)
/// - `DOCWATCH_EXPIRED_POLICY` (optional): "every_cycle" or "once" (default: "every_cycle")
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub threshold_days: i64,
    pub schedule: String,
    pub dispatch_timeout: Duration,
    pub expired_policy: ExpiredNotificationPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threshold_days: DEFAULT_THRESHOLD_DAYS,
            schedule: DEFAULT_SCHEDULE.to_string(),
            dispatch_timeout: Duration::from_secs(10),
            expired_policy: ExpiredNotificationPolicy::default(),
        }
    }
}

impl ConfigLoader for SchedulerConfig {
    fn from_env() -> std::result::Result<Self, DocwatchError> {
        let defaults = Self::default();

        let schedule = match env_string("DOCWATCH_EXPIRY_SCHEDULE") {
            Some(expression) => expression,
            None => match env_string("DOCWATCH_EXPIRY_TRIGGER_TIME") {
                Some(time) => daily_at(&time)?,
                None => defaults.schedule,
            },
        };

        let expired_policy = match env_string("DOCWATCH_EXPIRED_POLICY") {
            Some(raw) => raw.parse()?,
            None => defaults.expired_policy,
        };

        Ok(Self {
            threshold_days: parse_env_var("DOCWATCH_EXPIRY_THRESHOLD_DAYS", defaults.threshold_days)?,
            schedule,
            dispatch_timeout: Duration::from_secs(parse_env_var(
                "DOCWATCH_EXPIRY_DISPATCH_TIMEOUT_SECS",
                defaults.dispatch_timeout.as_secs(),
            )?),
            expired_policy,
        })
    }

    fn validate(&self) -> std::result::Result<(), DocwatchError> {
        if self.threshold_days < 0 {
            return Err(DocwatchError::configuration(
                "threshold days must not be negative",
                "DOCWATCH_EXPIRY_THRESHOLD_DAYS",
            ));
        }

        if threshold_cutoff(Utc::now(), self.threshold_days).is_none() {
            return Err(DocwatchError::configuration(
                format!("threshold of {} days is out of range", self.threshold_days),
                "DOCWATCH_EXPIRY_THRESHOLD_DAYS",
            ));
        }

        if self.dispatch_timeout.is_zero() {
            return Err(DocwatchError::configuration(
                "dispatch timeout must be greater than 0",
                "DOCWATCH_EXPIRY_DISPATCH_TIMEOUT_SECS",
            ));
        }

        parse_schedule(&self.schedule)?;
        Ok(())
    }
}

/// Outcome of one scan-and-notify cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub expiring_found: usize,
    pub expiring_notified: usize,
    pub expired_found: usize,
    pub expired_notified: usize,
    /// Dispatch failures plus flag updates that failed after a successful dispatch.
    pub failures: usize,
    /// Documents returned by a query whose classification did not match it.
    pub skipped: usize,
}

/// Clears the in-progress flag when a cycle ends, including on early return.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ExpiryCycle {
    store: Arc<dyn DocumentStore>,
    notifier: Option<Arc<dyn ExpiryNotifier>>,
    config: SchedulerConfig,
    in_progress: AtomicBool,
}

impl ExpiryCycle {
    async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DocumentError::CycleInProgress);
        }
        let _guard = CycleGuard(&self.in_progress);

        info!(now = %now, threshold_days = self.config.threshold_days, "Checking for expiring documents");
        let mut report = CycleReport::default();

        let expiring = self
            .store
            .find_expiring(self.config.threshold_days, now)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to get expiring documents");
                e
            })?;
        report.expiring_found = expiring.len();
        info!(count = expiring.len(), "Found expiring documents");

        for doc in &expiring {
            let Some(request) = self.request_for(doc, now, false) else {
                report.skipped += 1;
                continue;
            };
            if let Err(e) = self.dispatch(doc, &request).await {
                error!(
                    document_id = doc.id,
                    error = %e,
                    retriable = e.is_retriable(),
                    "Failed to send expiry notification"
                );
                report.failures += 1;
                continue;
            }

            report.expiring_notified += 1;
            if let Err(e) = self.store.mark_notified(doc.id).await {
                error!(document_id = doc.id, error = %e, "Failed to mark notification sent");
                report.failures += 1;
            }
        }

        let expired = self.store.find_expired(now).await.map_err(|e| {
            error!(error = %e, partial = ?report, "Failed to get expired documents");
            e
        })?;
        let expired: Vec<Document> = match self.config.expired_policy {
            ExpiredNotificationPolicy::EveryCycle => expired,
            ExpiredNotificationPolicy::Once => expired
                .into_iter()
                .filter(|doc| !doc.expired_notification_sent)
                .collect(),
        };
        report.expired_found = expired.len();
        info!(count = expired.len(), policy = %self.config.expired_policy, "Found expired documents");

        for doc in &expired {
            let Some(request) = self.request_for(doc, now, true) else {
                report.skipped += 1;
                continue;
            };
            if let Err(e) = self.dispatch(doc, &request).await {
                error!(
                    document_id = doc.id,
                    error = %e,
                    retriable = e.is_retriable(),
                    "Failed to send expired notification"
                );
                report.failures += 1;
                continue;
            }

            report.expired_notified += 1;
            if self.config.expired_policy == ExpiredNotificationPolicy::Once {
                if let Err(e) = self.store.mark_expired_notified(doc.id).await {
                    error!(document_id = doc.id, error = %e, "Failed to mark expired notification sent");
                    report.failures += 1;
                }
            }
        }

        info!(
            expiring_found = report.expiring_found,
            expiring_notified = report.expiring_notified,
            expired_found = report.expired_found,
            expired_notified = report.expired_notified,
            failures = report.failures,
            skipped = report.skipped,
            "Expiry cycle complete"
        );
        Ok(report)
    }

    /// Classify `doc` and build its request, or `None` when the classification
    /// disagrees with the pass that returned it.
    fn request_for(
        &self,
        doc: &Document,
        now: DateTime<Utc>,
        expired_pass: bool,
    ) -> Option<DocumentExpiryRequest> {
        match dispatcher::build_request(doc, now, self.config.threshold_days) {
            Some(request) if request.is_expired == expired_pass => Some(request),
            other => {
                warn!(
                    document_id = doc.id,
                    expiry_date = ?doc.expiry_date,
                    expired_pass,
                    classified_expired = other.map(|r| r.is_expired),
                    "Document classification does not match its query, skipping"
                );
                None
            }
        }
    }

    async fn dispatch(&self, doc: &Document, request: &DocumentExpiryRequest) -> Result<()> {
        let Some(notifier) = &self.notifier else {
            debug!(document_id = doc.id, "Notification client not available, skipping notification");
            return Ok(());
        };

        let timeout = self.config.dispatch_timeout;
        tokio::time::timeout(timeout, notifier.notify_document_expiry(request))
            .await
            .map_err(|_| DocumentError::Timeout(timeout))??;

        info!(
            document_id = doc.id,
            user_uuid = %doc.user_uuid,
            is_expired = request.is_expired,
            "Sent document expiry notification"
        );
        Ok(())
    }
}

#[async_trait]
impl CronJob for ExpiryCycle {
    async fn run(&self) {
        match self.run_cycle(Utc::now()).await {
            Ok(_) => {}
            Err(DocumentError::CycleInProgress) => {
                warn!("Previous expiry cycle still running, skipping this tick");
            }
            Err(e) => error!(error = %e, "Expiry cycle aborted"),
        }
    }
}

/// Periodic expiry scan bound to a document store and an optional notifier.
///
/// Without a notifier every dispatch is a logged no-op that counts as
/// success, so flags are still set.
pub struct ExpiryScheduler {
    cycle: Arc<ExpiryCycle>,
    cron: CronScheduler,
}

impl ExpiryScheduler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Option<Arc<dyn ExpiryNotifier>>,
        config: SchedulerConfig,
    ) -> Self {
        if notifier.is_none() {
            warn!("No notification channel configured; expiry notifications are disabled");
        }

        Self {
            cycle: Arc::new(ExpiryCycle {
                store,
                notifier,
                config,
                in_progress: AtomicBool::new(false),
            }),
            cron: CronScheduler::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.cycle.config
    }

    pub fn notifications_enabled(&self) -> bool {
        self.cycle.notifier.is_some()
    }

    /// Register the daily job and begin firing. Calling `start` again is a
    /// no-op.
    pub fn start(&self) -> Result<()> {
        let registered = self.cron.register(
            EXPIRY_JOB_NAME,
            &self.cycle.config.schedule,
            self.cycle.clone(),
        )?;

        if !registered && self.cron.is_running() {
            info!("Expiry scheduler already started");
            return Ok(());
        }

        self.cron.start();
        info!(schedule = %self.cycle.config.schedule, "Expiry scheduler started");
        Ok(())
    }

    /// Stop future firings. A cycle already running finishes on its own.
    pub fn stop(&self) {
        self.cron.stop();
        info!("Expiry scheduler stopped");
    }

    /// Stop and wait for an in-flight cycle to finish.
    pub async fn shutdown(&self) {
        self.stop();
        self.cron.wait_stopped().await;
    }

    pub fn is_running(&self) -> bool {
        self.cron.is_running()
    }

    /// Run one cycle immediately at reference time `now`.
    ///
    /// Returns [`DocumentError::CycleInProgress`] if another cycle is running.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        self.cycle.run_cycle(now).await
    }
}
