//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::gender::Gender;
use super::role::UserRole;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique account identifier.
    pub id: Uuid,
    /// Display name.
    pub full_name: String,
    /// Login email, unique.
    pub email: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Current role.
    pub role: UserRole,
    pub gender: Gender,
    /// Phone number in `+<digits>` form, unique.
    pub phone: String,
    /// Soft-deletion timestamp.
    #[serde(rename = "archived_at", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether an administrator has assigned a functional role yet.
    pub fn is_activated(&self) -> bool {
        !self.role.is_unset()
    }

    /// Whether the account has been soft-deleted.
    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check if this user has admin privileges.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Data required to create a new account. The role is always `unset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub full_name: String,
    pub email: String,
    /// Pre-hashed password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub gender: Gender,
    /// Normalised phone number.
    pub phone: String,
}
