use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use sis_core::error::AppError;
use sis_core::result::AppResult;
use sis_entity::admin::AdminProfile;
use sis_entity::profile::{
    AdminEnrollment, AssignedProfile, RoleAssignment, StudentEnrollment, StudentProfile,
    TeacherEnrollment, TeacherProfile,
};
use sis_entity::user::{NewAccount, User, UserRole};

use super::{MemoryState, MemoryStore};
use crate::rules;
use crate::store::{AccountConflicts, AccountStore, PurgeReport};

impl MemoryState {
    pub(super) fn live_user(&self, id: Uuid) -> Option<&User> {
        self.users.get(&id).filter(|u| !u.is_archived())
    }

    fn conflicts(&self, email: &str, phone: &str) -> AccountConflicts {
        AccountConflicts {
            email: self.users.values().any(|u| u.email.eq_ignore_ascii_case(email)),
            phone: self.users.values().any(|u| u.phone == phone),
        }
    }

    fn admin_exists(&self) -> bool {
        self.users
            .values()
            .any(|u| u.role.is_admin() && !u.is_archived())
    }

    fn new_admin_profile(&self, user_id: Uuid, e: &AdminEnrollment) -> AppResult<AdminProfile> {
        if self.admins.values().any(|a| a.employee_id == e.employee_id) {
            return Err(rules::admin_employee_id_taken());
        }
        let now = Utc::now();
        Ok(AdminProfile {
            id: Uuid::new_v4(),
            user_id,
            staff_role: e.staff_role.clone(),
            employee_id: e.employee_id.clone(),
            joined_at: e.joined_at,
            created_at: now,
            updated_at: now,
        })
    }

    fn new_student_profile(
        &self,
        user_id: Uuid,
        e: &StudentEnrollment,
    ) -> AppResult<(StudentProfile, BTreeSet<Uuid>)> {
        if !self.classes.contains(&e.class_id) {
            return Err(rules::class_not_found());
        }
        let guardians: BTreeSet<Uuid> = e
            .guardian_ids
            .iter()
            .copied()
            .filter(|id| self.guardians.contains_key(id))
            .collect();
        if guardians.len() != 2 {
            return Err(rules::guardian_count());
        }
        if self.students.values().any(|s| s.nisn == e.nisn) {
            return Err(rules::nisn_taken());
        }
        let now = Utc::now();
        let profile = StudentProfile {
            id: Uuid::new_v4(),
            user_id,
            class_id: e.class_id,
            nisn: e.nisn.clone(),
            created_at: now,
            updated_at: now,
        };
        Ok((profile, guardians))
    }

    fn new_teacher_profile(
        &self,
        user_id: Uuid,
        e: &TeacherEnrollment,
    ) -> AppResult<(TeacherProfile, BTreeSet<Uuid>)> {
        let requested: BTreeSet<Uuid> = e.subject_ids.iter().copied().collect();
        let found = requested.iter().filter(|id| self.subjects.contains(*id)).count();
        if found < requested.len() {
            return Err(rules::subjects_missing(requested.len() - found));
        }
        if self
            .teachers
            .values()
            .any(|t| t.nuptk == e.nuptk || t.employee_id == e.employee_id)
        {
            return Err(rules::teacher_ids_taken());
        }
        let now = Utc::now();
        let profile = TeacherProfile {
            id: Uuid::new_v4(),
            user_id,
            nuptk: e.nuptk.clone(),
            employee_id: e.employee_id.clone(),
            joined_at: e.joined_at,
            created_at: now,
            updated_at: now,
        };
        Ok((profile, requested))
    }

    fn set_role(&mut self, user_id: Uuid, role: UserRole) {
        if let Some(user) = self.users.get_mut(&user_id) {
            user.role = role;
            user.updated_at = Utc::now();
        }
    }

    /// Remove an account and everything that cascades from it.
    fn remove_account(&mut self, user_id: Uuid) {
        self.users.remove(&user_id);

        let admin_ids: Vec<Uuid> = self
            .admins
            .values()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.id)
            .collect();
        for admin_id in admin_ids {
            self.admins.remove(&admin_id);
            self.grants.retain(|(a, _)| *a != admin_id);
            for permission in self.permissions.values_mut() {
                if permission.author_id == Some(admin_id) {
                    permission.author_id = None;
                }
            }
        }

        let student_ids: Vec<Uuid> = self
            .students
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id)
            .collect();
        for student_id in student_ids {
            self.students.remove(&student_id);
            self.student_guardians.retain(|(s, _)| *s != student_id);
        }

        let teacher_ids: Vec<Uuid> = self
            .teachers
            .values()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.id)
            .collect();
        for teacher_id in teacher_ids {
            self.teachers.remove(&teacher_id);
            self.teacher_subjects.retain(|(t, _)| *t != teacher_id);
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.live_user(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| !u.is_archived() && u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_conflicts(&self, email: &str, phone: &str) -> AppResult<AccountConflicts> {
        Ok(self.state.lock().await.conflicts(email, phone))
    }

    async fn create(&self, account: NewAccount) -> AppResult<User> {
        let mut state = self.state.lock().await;
        if state.conflicts(&account.email, &account.phone).any() {
            return Err(AppError::conflict("Failed to create user: duplicate entry"));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            full_name: account.full_name,
            email: account.email,
            password_hash: account.password_hash,
            role: UserRole::Unset,
            gender: account.gender,
            phone: account.phone,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn admin_exists(&self) -> AppResult<bool> {
        Ok(self.state.lock().await.admin_exists())
    }

    async fn promote_to_admin(
        &self,
        user_id: Uuid,
        enrollment: &AdminEnrollment,
        grants: &[Uuid],
    ) -> AppResult<AdminProfile> {
        let mut state = self.state.lock().await;
        if state.live_user(user_id).is_none() {
            return Err(rules::user_not_found());
        }
        if state.admin_exists() {
            return Err(rules::admin_already_exists());
        }
        if let Some(missing) = grants.iter().find(|id| !state.permissions.contains_key(*id)) {
            return Err(AppError::not_found(format!("permission {missing} not found")));
        }
        let profile = state.new_admin_profile(user_id, enrollment)?;

        state.set_role(user_id, UserRole::Admin);
        state.admins.insert(profile.id, profile.clone());
        for permission_id in grants {
            state.grants.insert((profile.id, *permission_id));
        }
        Ok(profile)
    }

    async fn assign_role(
        &self,
        user_id: Uuid,
        assignment: &RoleAssignment,
    ) -> AppResult<AssignedProfile> {
        let mut state = self.state.lock().await;
        match state.live_user(user_id).map(|u| u.role) {
            None => return Err(rules::user_not_found()),
            Some(role) if !role.is_unset() => return Err(rules::role_already_assigned(role)),
            Some(_) => {}
        }

        let profile = match assignment {
            RoleAssignment::Student(e) => {
                let (profile, guardians) = state.new_student_profile(user_id, e)?;
                for guardian_id in guardians {
                    state.student_guardians.insert((profile.id, guardian_id));
                }
                state.students.insert(profile.id, profile.clone());
                AssignedProfile::Student(profile)
            }
            RoleAssignment::Teacher(e) => {
                let (profile, subjects) = state.new_teacher_profile(user_id, e)?;
                for subject_id in subjects {
                    state.teacher_subjects.insert((profile.id, subject_id));
                }
                state.teachers.insert(profile.id, profile.clone());
                AssignedProfile::Teacher(profile)
            }
            RoleAssignment::Admin(e) => {
                let profile = state.new_admin_profile(user_id, e)?;
                state.admins.insert(profile.id, profile.clone());
                AssignedProfile::Admin(profile)
            }
        };
        state.set_role(user_id, assignment.role());
        Ok(profile)
    }

    async fn soft_delete(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.users.get_mut(&user_id) {
            Some(user) if user.deleted_at.is_none() => {
                user.deleted_at = Some(at);
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_soft_deleted(&self, cutoff: DateTime<Utc>) -> AppResult<PurgeReport> {
        let mut state = self.state.lock().await;

        let doomed: Vec<Uuid> = state
            .users
            .values()
            .filter(|u| u.deleted_at.is_some_and(|at| at <= cutoff))
            .map(|u| u.id)
            .collect();

        let doomed_students: BTreeSet<Uuid> = state
            .students
            .values()
            .filter(|s| doomed.contains(&s.user_id))
            .map(|s| s.id)
            .collect();
        let candidates: BTreeSet<Uuid> = state
            .student_guardians
            .iter()
            .filter(|(s, _)| doomed_students.contains(s))
            .map(|(_, g)| *g)
            .collect();

        for user_id in &doomed {
            state.remove_account(*user_id);
        }

        let mut guardians = 0;
        for guardian_id in candidates {
            let referenced = state.student_guardians.iter().any(|(_, g)| *g == guardian_id);
            if !referenced && state.guardians.remove(&guardian_id).is_some() {
                guardians += 1;
            }
        }

        Ok(PurgeReport {
            accounts: doomed.len() as u64,
            guardians,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sis_entity::user::Gender;

    fn account(email: &str, phone: &str) -> NewAccount {
        NewAccount {
            full_name: "Test Account".into(),
            email: email.into(),
            password_hash: "hash".into(),
            gender: Gender::Female,
            phone: phone.into(),
        }
    }

    fn student(class_id: Uuid, guardians: Vec<Uuid>, nisn: &str) -> RoleAssignment {
        RoleAssignment::Student(StudentEnrollment {
            class_id,
            guardian_ids: guardians,
            nisn: nisn.into(),
        })
    }

    #[tokio::test]
    async fn test_conflicts_are_case_insensitive_on_email() {
        let store = MemoryStore::new();
        store.create(account("a@b.com", "+15550001111")).await.unwrap();

        let conflicts = store.find_conflicts("A@B.com", "+15550002222").await.unwrap();
        assert!(conflicts.email);
        assert!(!conflicts.phone);
    }

    #[tokio::test]
    async fn test_assign_student_requires_two_existing_guardians() {
        let store = MemoryStore::new();
        let user = store.create(account("s@b.com", "+15550001111")).await.unwrap();
        let class_id = store.insert_class().await;
        let mother = store.insert_guardian("Mother", Gender::Female).await;

        let err = store
            .assign_role(user.id, &student(class_id, vec![mother, Uuid::new_v4()], "001"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "existing parents must be 2");
        assert_eq!(store.find_by_id(user.id).await.unwrap().unwrap().role, UserRole::Unset);

        let father = store.insert_guardian("Father", Gender::Male).await;
        let profile = store
            .assign_role(user.id, &student(class_id, vec![mother, father], "001"))
            .await
            .unwrap();
        assert!(matches!(profile, AssignedProfile::Student(_)));
        assert_eq!(store.find_by_id(user.id).await.unwrap().unwrap().role, UserRole::Student);
    }

    #[tokio::test]
    async fn test_promote_missing_user_is_not_found() {
        let store = MemoryStore::new();
        let enrollment = AdminEnrollment {
            staff_role: "principal".into(),
            employee_id: "A-01".into(),
            joined_at: Utc::now(),
        };

        let err = store
            .promote_to_admin(Uuid::new_v4(), &enrollment, &[])
            .await
            .unwrap_err();
        assert!(err.is(sis_core::ErrorKind::NotFound));

        let user = store.create(account("a@b.com", "+15550001111")).await.unwrap();
        store.promote_to_admin(user.id, &enrollment, &[]).await.unwrap();
        let other = store.create(account("b@b.com", "+15550002222")).await.unwrap();
        let err = store.promote_to_admin(other.id, &enrollment, &[]).await.unwrap_err();
        assert!(err.is(sis_core::ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_assign_twice_conflicts() {
        let store = MemoryStore::new();
        let user = store.create(account("t@b.com", "+15550001111")).await.unwrap();
        let subject = store.insert_subject().await;
        let teacher = RoleAssignment::Teacher(TeacherEnrollment {
            subject_ids: vec![subject],
            nuptk: "1234567890123456".into(),
            employee_id: "T-01".into(),
            joined_at: Utc::now(),
        });

        store.assign_role(user.id, &teacher).await.unwrap();
        let err = store.assign_role(user.id, &teacher).await.unwrap_err();
        assert!(err.is(sis_core::ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_purge_cascades_to_orphaned_guardians() {
        let store = MemoryStore::new();
        let class_id = store.insert_class().await;
        let shared = store.insert_guardian("Shared", Gender::Female).await;
        let only_first = store.insert_guardian("First Only", Gender::Male).await;
        let only_second = store.insert_guardian("Second Only", Gender::Male).await;

        let first = store.create(account("1@b.com", "+15550000001")).await.unwrap();
        let second = store.create(account("2@b.com", "+15550000002")).await.unwrap();
        store
            .assign_role(first.id, &student(class_id, vec![shared, only_first], "001"))
            .await
            .unwrap();
        store
            .assign_role(second.id, &student(class_id, vec![shared, only_second], "002"))
            .await
            .unwrap();

        let now = Utc::now();
        store.soft_delete(first.id, now - Duration::days(31)).await.unwrap();
        store.soft_delete(second.id, now - Duration::days(1)).await.unwrap();

        let report = store.purge_soft_deleted(now - Duration::days(30)).await.unwrap();
        assert_eq!(report, PurgeReport { accounts: 1, guardians: 1 });
        assert!(store.raw_user(first.id).await.is_none());
        assert!(store.raw_user(second.id).await.is_some());
        assert!(!store.guardian_exists(only_first).await);
        assert!(store.guardian_exists(shared).await);
        assert!(store.guardian_exists(only_second).await);
    }
}
