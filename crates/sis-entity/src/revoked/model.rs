//! Revoked refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::reason::RevocationReason;

/// A refresh token invalidated before its natural expiry.
///
/// Rows are never updated. Once `revoked_until` has passed the token would be
/// rejected on expiry anyway, so the sweeper removes the row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RevokedToken {
    #[serde(skip_serializing)]
    pub id: Uuid,
    /// The exact token string.
    #[serde(skip_serializing)]
    pub token: String,
    /// Reason code.
    pub reason: String,
    /// Original expiry of the revoked token.
    pub revoked_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RevokedToken {
    /// Human-readable denial message for this revocation.
    pub fn message(&self) -> String {
        RevocationReason::from_code(&self.reason).message()
    }

    /// Whether the row can be pruned at `now`.
    pub fn is_harmless_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_until <= now
    }
}
