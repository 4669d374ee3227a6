//! Claims carried by access and refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sis_entity::user::UserRole;

/// Identity claim embedded in both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account id.
    pub sub: Uuid,
    /// Role at issuance.
    pub role: UserRole,
    /// Whether the session survives browser restarts.
    pub remember_me: bool,
    /// Silent rotation deadline (seconds since epoch). Refresh tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate_at: Option<i64>,
    /// Which key signed this token.
    pub kind: TokenKind,
    /// Random token id, so tokens minted in the same second differ.
    pub jti: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Access or refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived bearer for individual requests.
    Access,
    /// Long-lived bearer that mints new access tokens.
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl Claims {
    /// Returns the user ID from the subject claim.
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether a refresh at `now` should also mint a new refresh token.
    pub fn should_rotate(&self, now: DateTime<Utc>) -> bool {
        self.rotate_at.is_some_and(|deadline| now.timestamp() >= deadline)
    }
}
