//! Hard-deletes accounts soft-deleted longer than the retention window.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing;

use sis_core::error::AppError;
use sis_database::{AccountStore, PurgeReport};

use crate::executor::{JobExecutionError, SweepJob};

/// Handles account purges. Guardians left without any student go with them.
#[derive(Clone)]
pub struct AccountPurgeJob {
    accounts: Arc<dyn AccountStore>,
    retention: Duration,
}

impl std::fmt::Debug for AccountPurgeJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountPurgeJob")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl AccountPurgeJob {
    pub fn new(accounts: Arc<dyn AccountStore>, retention_days: u32) -> Self {
        Self {
            accounts,
            retention: Duration::days(i64::from(retention_days)),
        }
    }

    /// Purge accounts soft-deleted at or before `now - retention`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<PurgeReport, AppError> {
        let cutoff = now - self.retention;
        let report = self.accounts.purge_soft_deleted(cutoff).await?;
        tracing::debug!(
            accounts = report.accounts,
            guardians = report.guardians,
            cutoff = %cutoff,
            "Soft-deleted accounts purged"
        );
        Ok(report)
    }
}

#[async_trait]
impl SweepJob for AccountPurgeJob {
    fn job_type(&self) -> &'static str {
        "account_purge"
    }

    async fn execute(&self, now: DateTime<Utc>) -> Result<u64, JobExecutionError> {
        let report = self
            .run_once(now)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Account purge failed: {e}")))?;
        Ok(report.accounts + report.guardians)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sis_database::MemoryStore;
    use sis_entity::profile::{RoleAssignment, StudentEnrollment};
    use sis_entity::user::{Gender, NewAccount};
    use uuid::Uuid;

    async fn student(store: &MemoryStore, n: u8, class_id: Uuid, guardians: [Uuid; 2]) -> Uuid {
        let user = store
            .create(NewAccount {
                full_name: format!("Student {n}"),
                email: format!("student{n}@school.test"),
                password_hash: "hash".into(),
                gender: Gender::Female,
                phone: format!("+628110000000{n}"),
            })
            .await
            .unwrap();
        store
            .assign_role(
                user.id,
                &RoleAssignment::Student(StudentEnrollment {
                    class_id,
                    guardian_ids: guardians.to_vec(),
                    nisn: format!("00919137{n:02}"),
                }),
            )
            .await
            .unwrap();
        user.id
    }

    #[tokio::test]
    async fn test_purge_respects_retention_and_orphans() {
        let store = MemoryStore::new();
        let class_id = store.insert_class().await;
        let shared = store.insert_guardian("Shared Parent", Gender::Male).await;
        let only_first = store.insert_guardian("First Parent", Gender::Female).await;
        let only_second = store.insert_guardian("Second Parent", Gender::Female).await;

        let first = student(&store, 1, class_id, [shared, only_first]).await;
        let second = student(&store, 2, class_id, [shared, only_second]).await;

        let now = Utc::now();
        store.soft_delete(first, now - Duration::days(31)).await.unwrap();
        store.soft_delete(second, now - Duration::days(29)).await.unwrap();

        let job = AccountPurgeJob::new(Arc::new(store.clone()), 30);
        let report = job.run_once(now).await.unwrap();
        assert_eq!(report, PurgeReport { accounts: 1, guardians: 1 });

        assert!(store.raw_user(first).await.is_none());
        assert!(store.raw_user(second).await.is_some());
        assert!(!store.guardian_exists(only_first).await);
        assert!(store.guardian_exists(shared).await);
        assert!(store.guardian_exists(only_second).await);

        assert_eq!(job.execute(now).await.unwrap(), 0);
    }
}
