//! Collaborator interfaces consumed by the auth core.
//!
//! Each trait has a Postgres implementation in [`crate::repositories`] and an
//! in-memory implementation in [`crate::memory`]. Multi-table writes are
//! expressed as single trait methods or as a [`PermissionUnitOfWork`], so the
//! implementation owns the transaction boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sis_core::result::AppResult;
use sis_entity::admin::{AdminProfile, AdminWithGrants};
use sis_entity::permission::{NewPermission, Permission, PermissionFilter};
use sis_entity::profile::{AdminEnrollment, AssignedProfile, RoleAssignment};
use sis_entity::revoked::{RevocationReason, RevokedToken};
use sis_entity::user::{NewAccount, User};

/// Durable set of revoked refresh tokens.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Point lookup on the exact token string.
    async fn find(&self, token: &str) -> AppResult<Option<RevokedToken>>;

    /// Record a revocation. Revoking an already revoked token is a no-op.
    async fn revoke(
        &self,
        token: &str,
        reason: &RevocationReason,
        valid_until: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Delete every record whose `revoked_until` is at or before `now`.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Which unique account fields are already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountConflicts {
    pub email: bool,
    pub phone: bool,
}

impl AccountConflicts {
    pub fn any(&self) -> bool {
        self.email || self.phone
    }
}

/// Rows removed by one account purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    /// Hard-deleted accounts.
    pub accounts: u64,
    /// Guardians left without any student and removed with them.
    pub guardians: u64,
}

/// Account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find a live (not soft-deleted) account by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a live account by email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Check whether the email or phone is already registered.
    async fn find_conflicts(&self, email: &str, phone: &str) -> AppResult<AccountConflicts>;

    /// Create an account with role `unset`.
    async fn create(&self, account: NewAccount) -> AppResult<User>;

    /// Whether any account currently holds the `admin` role.
    async fn admin_exists(&self) -> AppResult<bool>;

    /// Bootstrap the first administrator in one transaction: set role `admin`,
    /// create the admin profile, and grant every permission in `grants`.
    ///
    /// Fails with `NotFound` for a missing account and `Conflict` once a live
    /// administrator exists.
    async fn promote_to_admin(
        &self,
        user_id: Uuid,
        enrollment: &AdminEnrollment,
        grants: &[Uuid],
    ) -> AppResult<AdminProfile>;

    /// Move an `unset` account to a functional role in one transaction,
    /// creating the role profile and its associations.
    ///
    /// Fails with `Conflict` if the account already holds a functional role,
    /// `NotFound` for a missing class or subject, and `Conflict` for a taken
    /// unique identifier or a guardian count other than two.
    async fn assign_role(
        &self,
        user_id: Uuid,
        assignment: &RoleAssignment,
    ) -> AppResult<AssignedProfile>;

    /// Soft-delete an account. Returns `false` if it was not live.
    async fn soft_delete(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;

    /// Hard-delete accounts soft-deleted at or before `cutoff`, plus guardians
    /// that no remaining student references.
    async fn purge_soft_deleted(&self, cutoff: DateTime<Utc>) -> AppResult<PurgeReport>;
}

/// Permission and grant persistence.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Permission>>;

    /// Filtered listing ordered by creation time, at most `limit` rows.
    async fn list(&self, filter: &PermissionFilter, limit: u32) -> AppResult<Vec<Permission>>;

    /// Load the admin profile of `user_id` with every granted permission.
    async fn find_admin_with_grants(&self, user_id: Uuid) -> AppResult<Option<AdminWithGrants>>;

    /// Open a transaction for a registry mutation.
    async fn begin(&self) -> AppResult<Box<dyn PermissionUnitOfWork>>;
}

/// A transaction over permissions and grants.
///
/// Dropping the unit of work without calling [`commit`](Self::commit) rolls
/// every change back.
#[async_trait]
pub trait PermissionUnitOfWork: Send {
    async fn find_by_id(&mut self, id: Uuid) -> AppResult<Option<Permission>>;

    /// Exact, case-sensitive name lookup.
    async fn find_by_name(&mut self, name: &str) -> AppResult<Option<Permission>>;

    async fn insert(&mut self, permission: &NewPermission) -> AppResult<Permission>;

    /// Persist name and description of an existing row.
    async fn update(&mut self, permission: &Permission) -> AppResult<Permission>;

    async fn delete(&mut self, id: Uuid) -> AppResult<()>;

    /// Whether any administrator holds the permission.
    async fn is_granted_to_anyone(&mut self, permission_id: Uuid) -> AppResult<bool>;

    async fn find_admin_with_grants(&mut self, user_id: Uuid) -> AppResult<Option<AdminWithGrants>>;

    /// Whether a live administrator other than `excluding_admin` holds the
    /// permission. Grants of soft-deleted accounts do not count.
    async fn has_other_holder(&mut self, permission_id: Uuid, excluding_admin: Uuid) -> AppResult<bool>;

    async fn append_grant(&mut self, admin_id: Uuid, permission_id: Uuid) -> AppResult<()>;

    async fn remove_grant(&mut self, admin_id: Uuid, permission_id: Uuid) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
