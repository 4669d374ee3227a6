//! Sweep job trait and the overlap-guarded executor around it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing;

use sis_core::error::AppError;

/// A periodic cleanup task.
#[async_trait]
pub trait SweepJob: Send + Sync + std::fmt::Debug {
    /// Stable name used in logs.
    fn job_type(&self) -> &'static str;

    /// Run once against the clock reading `now`; returns rows removed.
    async fn execute(&self, now: DateTime<Utc>) -> Result<u64, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Transient failure, retried on the next tick
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The job ran and removed this many rows.
    Completed(u64),
    /// The previous run was still in flight.
    Skipped,
    /// The job failed; it is retried on the next tick.
    Failed,
}

/// Runs a [`SweepJob`] at most once at a time.
#[derive(Debug)]
pub struct JobExecutor {
    job: Arc<dyn SweepJob>,
    running: AtomicBool,
}

impl JobExecutor {
    pub fn new(job: Arc<dyn SweepJob>) -> Self {
        Self {
            job,
            running: AtomicBool::new(false),
        }
    }

    pub fn job_type(&self) -> &'static str {
        self.job.job_type()
    }

    /// Run the job unless a previous tick is still running. Failures are
    /// logged, never propagated.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(job = self.job_type(), "Previous run still in flight, skipping tick");
            return TickOutcome::Skipped;
        }
        let _release = RunningGuard(&self.running);

        match self.job.execute(now).await {
            Ok(removed) => {
                tracing::info!(job = self.job_type(), removed, "Sweep completed");
                TickOutcome::Completed(removed)
            }
            Err(e) => {
                tracing::error!(job = self.job_type(), error = %e, "Sweep failed");
                TickOutcome::Failed
            }
        }
    }
}

/// Clears the in-flight flag even if the tick future is dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
