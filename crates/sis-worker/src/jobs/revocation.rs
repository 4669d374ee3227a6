//! Deletes revocation records that can no longer match a live token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing;

use sis_core::error::AppError;
use sis_database::RevocationStore;

use crate::executor::{JobExecutionError, SweepJob};

/// Handles revocation sweeps
#[derive(Clone)]
pub struct RevocationSweepJob {
    revocations: Arc<dyn RevocationStore>,
}

impl std::fmt::Debug for RevocationSweepJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationSweepJob").finish_non_exhaustive()
    }
}

impl RevocationSweepJob {
    pub fn new(revocations: Arc<dyn RevocationStore>) -> Self {
        Self { revocations }
    }

    /// Remove every record whose `revoked_until` is at or before `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let removed = self.revocations.sweep_expired(now).await?;
        tracing::debug!(removed, "Expired revocation records removed");
        Ok(removed)
    }
}

#[async_trait]
impl SweepJob for RevocationSweepJob {
    fn job_type(&self) -> &'static str {
        "revocation_sweep"
    }

    async fn execute(&self, now: DateTime<Utc>) -> Result<u64, JobExecutionError> {
        self.run_once(now)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Revocation sweep failed: {e}")))
    }
}
