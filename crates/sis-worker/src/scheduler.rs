//! Cron scheduler driving the sweep jobs.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use sis_core::config::WorkerConfig;
use sis_core::error::AppError;
use sis_database::{AccountStore, RevocationStore};

use crate::executor::JobExecutor;
use crate::jobs::{AccountPurgeJob, RevocationSweepJob};

/// Cron-based scheduler for the revocation sweep and the account purge.
///
/// Schedules are six-field cron expressions evaluated in UTC.
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler })
    }

    /// Register both sweeps from worker configuration.
    pub async fn register_sweeps(
        &self,
        config: &WorkerConfig,
        revocations: Arc<dyn RevocationStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Result<(), AppError> {
        let sweep = JobExecutor::new(Arc::new(RevocationSweepJob::new(revocations)));
        self.register(&config.revocation_sweep_cron, sweep).await?;

        let purge = JobExecutor::new(Arc::new(AccountPurgeJob::new(
            accounts,
            config.account_retention_days,
        )));
        self.register(&config.account_purge_cron, purge).await?;

        tracing::info!("All sweep jobs registered");
        Ok(())
    }

    /// Register one executor under a cron expression.
    pub async fn register(&self, schedule: &str, executor: JobExecutor) -> Result<(), AppError> {
        let job_type = executor.job_type();
        let executor = Arc::new(executor);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            Box::pin(async move {
                executor.tick(Utc::now()).await;
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid schedule '{schedule}' for {job_type}: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {job_type} schedule: {e}")))?;

        tracing::info!(job = job_type, schedule, "Registered sweep schedule");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
