//! Sweeper configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Schedules and retention window for the background sweeper.
///
/// Cron expressions use the six-field form with a leading seconds column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the sweeper is started with the server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Schedule for pruning expired revocation records.
    #[serde(default = "default_revocation_cron")]
    pub revocation_sweep_cron: String,
    /// Schedule for hard-deleting long soft-deleted accounts.
    #[serde(default = "default_purge_cron")]
    pub account_purge_cron: String,
    /// Days an account stays soft-deleted before it is purged.
    #[serde(default = "default_retention_days")]
    pub account_retention_days: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            revocation_sweep_cron: default_revocation_cron(),
            account_purge_cron: default_purge_cron(),
            account_retention_days: default_retention_days(),
        }
    }
}

impl WorkerConfig {
    /// Retention must be at least one day.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.account_retention_days == 0 {
            return Err(AppError::configuration(
                "account_retention_days must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

// every 6 hours
fn default_revocation_cron() -> String {
    "0 0 */6 * * *".to_string()
}

// every day at 2 AM
fn default_purge_cron() -> String {
    "0 0 2 * * *".to_string()
}

fn default_retention_days() -> u32 {
    30
}
