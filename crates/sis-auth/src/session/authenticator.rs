//! Per-request authentication with refresh fallback and silent rotation.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use sis_core::error::AppError;
use sis_database::RevocationStore;
use sis_entity::user::UserRole;

use crate::cookie::CookieFactory;
use crate::jwt::{Claims, TokenCodec, TokenKind};

/// Who is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: UserRole,
    pub remember_me: bool,
}

impl From<&Claims> for Identity {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            remember_me: claims.remember_me,
        }
    }
}

/// Whether the session may be used for functional endpoints yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// Valid session whose account still holds the `unset` role.
    NotActivated,
}

/// Result of authenticating one request.
#[derive(Debug, Clone)]
pub struct Authentication {
    pub identity: Identity,
    pub status: SessionStatus,
    /// Cookies the response should set. Empty unless the refresh path ran.
    pub cookies: Vec<Cookie<'static>>,
}

impl Authentication {
    fn resolved(claims: &Claims, cookies: Vec<Cookie<'static>>) -> Self {
        let status = if claims.role.is_unset() {
            SessionStatus::NotActivated
        } else {
            SessionStatus::Active
        };
        Self {
            identity: Identity::from(claims),
            status,
            cookies,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Whether a fresh refresh cookie was issued.
    pub fn rotated(&self, factory: &CookieFactory) -> bool {
        let name = factory.name(TokenKind::Refresh);
        self.cookies.iter().any(|c| c.name() == name)
    }
}

/// Resolves request cookies into an [`Authentication`].
///
/// Access tokens are trusted on signature and expiry alone. Only the refresh
/// path consults the revocation store, with one point lookup.
#[derive(Clone)]
pub struct Authenticator {
    codec: Arc<TokenCodec>,
    cookies: Arc<CookieFactory>,
    revocations: Arc<dyn RevocationStore>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(
        codec: Arc<TokenCodec>,
        cookies: Arc<CookieFactory>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            codec,
            cookies,
            revocations,
        }
    }

    pub async fn authenticate(&self, jar: &CookieJar) -> Result<Authentication, AppError> {
        self.authenticate_at(jar, Utc::now()).await
    }

    /// Authenticate as if the clock read `now`.
    pub async fn authenticate_at(
        &self,
        jar: &CookieJar,
        now: DateTime<Utc>,
    ) -> Result<Authentication, AppError> {
        if let Some(token) = self.cookies.token_value(jar, TokenKind::Access) {
            match self.codec.verify_at(token, TokenKind::Access, now) {
                Ok(claims) => return Ok(Authentication::resolved(&claims, Vec::new())),
                Err(e) if e.kind.is_recoverable_by_refresh() => {
                    debug!(kind = %e.kind, "Access token rejected, trying refresh token");
                }
                Err(e) => return Err(e),
            }
        }

        let refresh = self
            .cookies
            .token_value(jar, TokenKind::Refresh)
            .ok_or_else(|| AppError::unauthorized("no refresh token provided"))?;

        if let Some(record) = self.revocations.find(refresh).await? {
            return Err(AppError::token_revoked(record.message()));
        }

        let claims = self.codec.verify_at(refresh, TokenKind::Refresh, now)?;
        if claims.role.is_unset() {
            return Ok(Authentication::resolved(&claims, Vec::new()));
        }

        let access = self.codec.issue_at(
            claims.sub,
            claims.role,
            claims.remember_me,
            TokenKind::Access,
            now,
        )?;
        let mut cookies = vec![self.cookies.access_cookie(&access)];

        if claims.should_rotate(now) {
            let rotated = self.codec.issue_at(
                claims.sub,
                claims.role,
                claims.remember_me,
                TokenKind::Refresh,
                now,
            )?;
            cookies.push(self.cookies.refresh_cookie(&rotated));
            info!(user_id = %claims.sub, "Refresh token rotated");
        }

        Ok(Authentication::resolved(&claims, cookies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::codec::tests::test_config;
    use chrono::Duration;
    use sis_core::ErrorKind;
    use sis_core::config::CookieConfig;
    use sis_database::MemoryStore;
    use sis_entity::revoked::RevocationReason;

    struct Fixture {
        store: MemoryStore,
        codec: Arc<TokenCodec>,
        cookies: Arc<CookieFactory>,
        authenticator: Authenticator,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let codec = Arc::new(TokenCodec::new(&test_config()));
        let cookies = Arc::new(CookieFactory::new(CookieConfig::default()));
        let authenticator = Authenticator::new(
            codec.clone(),
            cookies.clone(),
            Arc::new(store.clone()),
        );
        Fixture {
            store,
            codec,
            cookies,
            authenticator,
        }
    }

    fn jar(access: Option<&str>, refresh: Option<&str>) -> CookieJar {
        let mut jar = CookieJar::new();
        if let Some(token) = access {
            jar = jar.add(Cookie::new("access_token", token.to_string()));
        }
        if let Some(token) = refresh {
            jar = jar.add(Cookie::new("refresh_token", token.to_string()));
        }
        jar
    }

    #[tokio::test]
    async fn test_valid_access_token_sets_no_cookies() {
        let f = fixture();
        let user = Uuid::new_v4();
        let access = f.codec.issue(user, UserRole::Teacher, false, TokenKind::Access).unwrap();

        let auth = f
            .authenticator
            .authenticate(&jar(Some(&access.token), None))
            .await
            .unwrap();
        assert_eq!(auth.identity.user_id, user);
        assert_eq!(auth.identity.role, UserRole::Teacher);
        assert!(auth.is_activated());
        assert!(auth.cookies.is_empty());
    }

    #[tokio::test]
    async fn test_missing_refresh_token() {
        let f = fixture();
        let err = f.authenticator.authenticate(&jar(None, None)).await.unwrap_err();
        assert!(err.is(ErrorKind::Unauthorized));
        assert_eq!(err.message, "no refresh token provided");

        let err = f
            .authenticator
            .authenticate(&jar(Some("garbage"), None))
            .await
            .unwrap_err();
        assert_eq!(err.message, "no refresh token provided");
    }

    #[tokio::test]
    async fn test_refresh_before_deadline_issues_access_only() {
        let f = fixture();
        let now = Utc::now();
        let refresh = f
            .codec
            .issue_at(Uuid::new_v4(), UserRole::Student, true, TokenKind::Refresh, now)
            .unwrap();

        let later = now + Duration::hours(1);
        let auth = f
            .authenticator
            .authenticate_at(&jar(None, Some(&refresh.token)), later)
            .await
            .unwrap();
        assert_eq!(auth.cookies.len(), 1);
        assert_eq!(auth.cookies[0].name(), "access_token");
        assert!(!auth.rotated(&f.cookies));
    }

    #[tokio::test]
    async fn test_refresh_at_deadline_rotates() {
        let f = fixture();
        let now = Utc::now();
        let user = Uuid::new_v4();
        let refresh = f
            .codec
            .issue_at(user, UserRole::Student, true, TokenKind::Refresh, now)
            .unwrap();
        let deadline = DateTime::from_timestamp(refresh.claims.rotate_at.unwrap(), 0).unwrap();

        let auth = f
            .authenticator
            .authenticate_at(&jar(None, Some(&refresh.token)), deadline)
            .await
            .unwrap();
        assert_eq!(auth.cookies.len(), 2);
        assert!(auth.rotated(&f.cookies));

        let rotated = auth.cookies.iter().find(|c| c.name() == "refresh_token").unwrap();
        let claims = f
            .codec
            .verify_at(rotated.value(), TokenKind::Refresh, deadline)
            .unwrap();
        assert_eq!(claims.sub, user);
        assert!(claims.remember_me);
        assert!(claims.exp > refresh.claims.exp);
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_is_rejected() {
        let f = fixture();
        let refresh = f
            .codec
            .issue(Uuid::new_v4(), UserRole::Admin, false, TokenKind::Refresh)
            .unwrap();
        f.store
            .revoke(&refresh.token, &RevocationReason::UserSignOut, refresh.claims.expires_at())
            .await
            .unwrap();

        let err = f
            .authenticator
            .authenticate(&jar(None, Some(&refresh.token)))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::TokenRevoked));
        assert_eq!(err.message, "user already signed out");
    }

    #[tokio::test]
    async fn test_access_token_ignores_revocation_store() {
        let f = fixture();
        let user = Uuid::new_v4();
        let access = f.codec.issue(user, UserRole::Admin, false, TokenKind::Access).unwrap();
        let refresh = f.codec.issue(user, UserRole::Admin, false, TokenKind::Refresh).unwrap();
        f.store
            .revoke(&refresh.token, &RevocationReason::UserSignOut, refresh.claims.expires_at())
            .await
            .unwrap();

        let auth = f
            .authenticator
            .authenticate(&jar(Some(&access.token), Some(&refresh.token)))
            .await
            .unwrap();
        assert_eq!(auth.identity.user_id, user);
    }

    #[tokio::test]
    async fn test_unset_role_is_not_activated() {
        let f = fixture();
        let refresh = f
            .codec
            .issue(Uuid::new_v4(), UserRole::Unset, false, TokenKind::Refresh)
            .unwrap();
        let auth = f
            .authenticator
            .authenticate(&jar(None, Some(&refresh.token)))
            .await
            .unwrap();
        assert_eq!(auth.status, SessionStatus::NotActivated);
        assert!(auth.cookies.is_empty());
    }

    #[tokio::test]
    async fn test_expired_refresh_token() {
        let f = fixture();
        let now = Utc::now();
        let refresh = f
            .codec
            .issue_at(Uuid::new_v4(), UserRole::Admin, false, TokenKind::Refresh, now)
            .unwrap();
        let err = f
            .authenticator
            .authenticate_at(&jar(None, Some(&refresh.token)), now + Duration::days(2))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::TokenExpired));
    }
}
