//! Cron-style recurring job scheduler
//!
//! Jobs are registered with a second-granularity cron expression
//! (`sec min hour day-of-month month day-of-week`, evaluated in local time) and
//! each runs in its own tokio task once the scheduler is started. A task sleeps
//! until the next fire time, runs the job to completion, then computes the next
//! fire time from the expression again.
//!
//! Stopping the scheduler prevents future firings but never interrupts a job
//! that is already running; [`CronScheduler::wait_stopped`] waits for those.
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use docwatch_core::schedule::{CronJob, CronScheduler};
//! use std::sync::Arc;
//!
//! struct Cleanup;
//!
//! #[async_trait]
//! impl CronJob for Cleanup {
//!     async fn run(&self) {
//!         tracing::info!("cleaning up");
//!     }
//! }
//!
//! # async fn example() -> Result<(), docwatch_core::DocwatchError> {
//! let scheduler = CronScheduler::new();
//! scheduler.register("cleanup", "0 0 3 * * *", Arc::new(Cleanup))?;
//! scheduler.start();
//! // ...
//! scheduler.stop();
//! scheduler.wait_stopped().await;
//! # Ok(())
//! # }
//! ```

use crate::error::DocwatchError;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A unit of work fired by the [`CronScheduler`].
#[async_trait]
pub trait CronJob: Send + Sync {
    async fn run(&self);
}

/// Parse a cron expression into a schedule.
pub fn parse_schedule(expression: &str) -> Result<Schedule, DocwatchError> {
    Schedule::from_str(expression).map_err(|e| {
        DocwatchError::configuration(
            format!("Invalid cron expression '{}': {}", expression, e),
            "DOCWATCH_EXPIRY_SCHEDULE",
        )
    })
}

/// Build the daily cron expression for a `HH:MM` trigger time.
///
/// `"09:00"` becomes `"0 0 9 * * *"`.
pub fn daily_at(trigger_time: &str) -> Result<String, DocwatchError> {
    let invalid = || {
        DocwatchError::configuration(
            format!("Invalid trigger time '{}': expected HH:MM", trigger_time),
            "DOCWATCH_EXPIRY_TRIGGER_TIME",
        )
    };

    let (hour, minute) = trigger_time.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;

    if hour > 23 || minute > 59 {
        return Err(invalid());
    }

    Ok(format!("0 {} {} * * *", minute, hour))
}

/// Next fire time strictly after `after`.
pub fn next_fire_after<Z: TimeZone>(schedule: &Schedule, after: &DateTime<Z>) -> Option<DateTime<Z>> {
    schedule.after(after).next()
}

struct RegisteredJob {
    name: String,
    expression: String,
    schedule: Schedule,
    job: Arc<dyn CronJob>,
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

#[derive(Default)]
struct SchedulerState {
    jobs: Vec<Arc<RegisteredJob>>,
    running: Option<Running>,
    draining: Vec<JoinHandle<()>>,
}

/// Registry of cron jobs with start/stop control.
pub struct CronScheduler {
    state: Mutex<SchedulerState>,
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CronScheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// Register a job under a unique name.
    ///
    /// Returns `Ok(false)` without registering when a job with the same name
    /// already exists. If the scheduler is running the job starts immediately.
    pub fn register(
        &self,
        name: &str,
        expression: &str,
        job: Arc<dyn CronJob>,
    ) -> Result<bool, DocwatchError> {
        let schedule = parse_schedule(expression)?;
        let mut state = self.lock_state()?;

        if state.jobs.iter().any(|j| j.name == name) {
            warn!(job = %name, "Cron job already registered, ignoring");
            return Ok(false);
        }

        let registered = Arc::new(RegisteredJob {
            name: name.to_string(),
            expression: expression.to_string(),
            schedule,
            job,
        });

        if let Some(running) = state.running.as_mut() {
            let handle = spawn_job(registered.clone(), running.shutdown_tx.subscribe());
            running.handles.push(handle);
        }

        info!(job = %name, expression = %expression, "Cron job registered");
        state.jobs.push(registered);
        Ok(true)
    }

    /// Begin firing registered jobs. Calling `start` on a running scheduler
    /// does nothing.
    pub fn start(&self) {
        let mut state = match self.lock_state() {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Failed to start cron scheduler");
                return;
            }
        };

        if state.running.is_some() {
            debug!("Cron scheduler already running");
            return;
        }

        let (shutdown_tx, _) = watch::channel(false);
        let handles = state
            .jobs
            .iter()
            .map(|job| spawn_job(job.clone(), shutdown_tx.subscribe()))
            .collect();

        info!(jobs = state.jobs.len(), "Cron scheduler started");
        state.running = Some(Running {
            shutdown_tx,
            handles,
        });
    }

    /// Halt future firings. In-flight jobs run to completion.
    pub fn stop(&self) {
        let mut state = match self.lock_state() {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Failed to stop cron scheduler");
                return;
            }
        };

        match state.running.take() {
            Some(running) => {
                let _ = running.shutdown_tx.send(true);
                state.draining.extend(running.handles);
                info!("Cron scheduler stopped");
            }
            None => debug!("Cron scheduler stop requested while not running"),
        }
    }

    /// Wait for job tasks of a stopped scheduler to finish their current run.
    pub async fn wait_stopped(&self) {
        let handles = match self.lock_state() {
            Ok(mut state) => std::mem::take(&mut state.draining),
            Err(_) => return,
        };

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Cron job task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_state()
            .map(|state| state.running.is_some())
            .unwrap_or(false)
    }

    pub fn job_count(&self) -> usize {
        self.lock_state().map(|state| state.jobs.len()).unwrap_or(0)
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, SchedulerState>, DocwatchError> {
        self.state
            .lock()
            .map_err(|_| DocwatchError::Internal("cron scheduler state poisoned".to_string()))
    }
}

fn spawn_job(job: Arc<RegisteredJob>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let next = match next_fire_after(&job.schedule, &now) {
                Some(next) => next,
                None => {
                    warn!(job = %job.name, expression = %job.expression, "Cron schedule has no future fire time");
                    break;
                }
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(job = %job.name, next_fire = %next, "Waiting for next cron fire");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown_rx.changed() => break,
            }

            if *shutdown_rx.borrow() {
                break;
            }

            debug!(job = %job.name, "Cron job fired");
            job.job.run().await;
        }

        debug!(job = %job.name, "Cron job loop exited");
    })
}
