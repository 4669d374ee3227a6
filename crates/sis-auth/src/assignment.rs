//! Moving a freshly registered account to its functional role.

use std::sync::Arc;

use tracing::info;

use sis_core::error::AppError;
use sis_database::AccountStore;
use sis_entity::profile::AssignedProfile;

use crate::payload::SetRolePayload;

/// Applies a [`SetRolePayload`] in one store transaction.
#[derive(Clone)]
pub struct RoleAssigner {
    accounts: Arc<dyn AccountStore>,
}

impl std::fmt::Debug for RoleAssigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleAssigner").finish_non_exhaustive()
    }
}

impl RoleAssigner {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Only `unset` accounts can be assigned; anything else is a conflict.
    pub async fn assign(&self, payload: SetRolePayload) -> Result<AssignedProfile, AppError> {
        let (target_id, assignment) = payload.into_assignment()?;
        let profile = self.accounts.assign_role(target_id, &assignment).await?;

        info!(target_id = %target_id, role = %assignment.role(), "Role assigned");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{StudentData, TeacherData};
    use chrono::Utc;
    use sis_core::ErrorKind;
    use sis_database::MemoryStore;
    use sis_entity::user::{Gender, NewAccount, UserRole};
    use uuid::Uuid;

    async fn unset_account(store: &MemoryStore, email: &str, phone: &str) -> Uuid {
        store
            .create(NewAccount {
                full_name: "Ada Lovelace".into(),
                email: email.into(),
                password_hash: "hash".into(),
                gender: Gender::Female,
                phone: phone.into(),
            })
            .await
            .unwrap()
            .id
    }

    fn set_role(target_id: Uuid, target_role: UserRole) -> SetRolePayload {
        SetRolePayload {
            target_id,
            target_role,
            student_data: None,
            teacher_data: None,
            admin_data: None,
        }
    }

    #[tokio::test]
    async fn test_student_assignment_then_conflict() {
        let store = MemoryStore::new();
        let assigner = RoleAssigner::new(Arc::new(store.clone()));
        let user = unset_account(&store, "ada@school.test", "+6281100000001").await;
        let class_id = store.insert_class().await;
        let mother = store.insert_guardian("Mother", Gender::Female).await;
        let father = store.insert_guardian("Father", Gender::Male).await;

        let mut payload = set_role(user, UserRole::Student);
        payload.student_data = Some(StudentData {
            class_id,
            parent_ids: vec![mother, father],
            nisn: "0091913711".into(),
        });
        let profile = assigner.assign(payload.clone()).await.unwrap();
        assert!(matches!(profile, AssignedProfile::Student(_)));
        assert_eq!(store.find_by_id(user).await.unwrap().unwrap().role, UserRole::Student);

        let err = assigner.assign(payload).await.unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_teacher_with_unknown_subject_changes_nothing() {
        let store = MemoryStore::new();
        let assigner = RoleAssigner::new(Arc::new(store.clone()));
        let user = unset_account(&store, "grace@school.test", "+6281100000002").await;
        let known = store.insert_subject().await;

        let mut payload = set_role(user, UserRole::Teacher);
        payload.teacher_data = Some(TeacherData {
            subject_ids: vec![known, Uuid::new_v4()],
            nuptk: "1234567890123456".into(),
            employee_id: "TCH-001".into(),
            joined_at: Utc::now(),
        });
        let err = assigner.assign(payload).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        assert_eq!(err.message, "1 subject(s) not found");
        assert_eq!(store.find_by_id(user).await.unwrap().unwrap().role, UserRole::Unset);
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let store = MemoryStore::new();
        let assigner = RoleAssigner::new(Arc::new(store.clone()));
        let mut payload = set_role(Uuid::new_v4(), UserRole::Student);
        payload.student_data = Some(StudentData {
            class_id: Uuid::new_v4(),
            parent_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            nisn: "0091913712".into(),
        });
        let err = assigner.assign(payload).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        assert!(err.fields.contains_key("target_id"));
    }
}
