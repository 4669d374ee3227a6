//! Scheduled sweeps for the SIS auth core.
//!
//! This crate provides:
//! - A cron scheduler that fires each sweep on its own schedule
//! - An executor that skips a tick while the previous run is still going
//! - The revocation sweep and the soft-deleted account purge

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, SweepJob, TickOutcome};
pub use jobs::{AccountPurgeJob, RevocationSweepJob};
pub use scheduler::CronScheduler;
