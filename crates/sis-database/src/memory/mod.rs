//! In-memory store implementing every collaborator trait.
//!
//! One Tokio mutex guards the whole state, which gives each call the same
//! all-or-nothing behaviour as a database transaction. Suitable for tests and
//! single-process demos only.

mod account;
mod permission;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use sis_core::result::AppResult;
use sis_entity::admin::AdminProfile;
use sis_entity::permission::Permission;
use sis_entity::profile::{Guardian, StudentProfile, TeacherProfile};
use sis_entity::revoked::{RevocationReason, RevokedToken};
use sis_entity::user::{Gender, User};

use crate::store::RevocationStore;

/// Everything the store holds. Cloned wholesale by permission transactions.
#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    admins: HashMap<Uuid, AdminProfile>,
    students: HashMap<Uuid, StudentProfile>,
    teachers: HashMap<Uuid, TeacherProfile>,
    classes: BTreeSet<Uuid>,
    subjects: BTreeSet<Uuid>,
    guardians: HashMap<Uuid, Guardian>,
    /// (student profile id, guardian id)
    student_guardians: BTreeSet<(Uuid, Uuid)>,
    /// (teacher profile id, subject id)
    teacher_subjects: BTreeSet<(Uuid, Uuid)>,
    permissions: HashMap<Uuid, Permission>,
    /// (admin profile id, permission id)
    grants: BTreeSet<(Uuid, Uuid)>,
    revoked: HashMap<String, RevokedToken>,
}

impl MemoryState {
    fn admin_by_user(&self, user_id: Uuid) -> Option<&AdminProfile> {
        self.admins.values().find(|a| a.user_id == user_id)
    }
}

/// In-memory [`AccountStore`](crate::AccountStore),
/// [`PermissionStore`](crate::PermissionStore) and [`RevocationStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class so student enrollments can reference it.
    pub async fn insert_class(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.classes.insert(id);
        id
    }

    /// Register a subject so teacher enrollments can reference it.
    pub async fn insert_subject(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.subjects.insert(id);
        id
    }

    /// Register a guardian.
    pub async fn insert_guardian(&self, full_name: &str, gender: Gender) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let guardian = Guardian {
            id,
            full_name: full_name.to_string(),
            phone: format!("+62{}", id.as_u128() % 10_000_000_000),
            email: format!("{id}@guardians.local"),
            gender,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.guardians.insert(id, guardian);
        id
    }

    /// Whether a guardian row still exists.
    pub async fn guardian_exists(&self, id: Uuid) -> bool {
        self.state.lock().await.guardians.contains_key(&id)
    }

    /// Number of stored revocation records.
    pub async fn revoked_count(&self) -> usize {
        self.state.lock().await.revoked.len()
    }

    /// Look up an account including soft-deleted ones.
    pub async fn raw_user(&self, id: Uuid) -> Option<User> {
        self.state.lock().await.users.get(&id).cloned()
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn find(&self, token: &str) -> AppResult<Option<RevokedToken>> {
        Ok(self.state.lock().await.revoked.get(token).cloned())
    }

    async fn revoke(
        &self,
        token: &str,
        reason: &RevocationReason,
        valid_until: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .revoked
            .entry(token.to_string())
            .or_insert_with(|| RevokedToken {
                id: Uuid::new_v4(),
                token: token.to_string(),
                reason: reason.code().to_string(),
                revoked_until: valid_until,
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.revoked.len();
        state.revoked.retain(|_, r| !r.is_harmless_at(now));
        Ok((before - state.revoked.len()) as u64)
    }
}
