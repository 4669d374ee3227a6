//! HS256 token issuance and verification with one key per token kind.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use sis_core::config::AuthConfig;
use sis_core::config::auth::{MAX_ACCESS_TTL_MINUTES, MAX_LEEWAY_SECONDS, MAX_LIFETIME_HOURS};
use sis_core::error::AppError;
use sis_entity::user::UserRole;

use super::claims::{Claims, TokenKind};

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signs and verifies access and refresh tokens.
///
/// Expiry is checked against a caller-supplied clock rather than inside
/// `jsonwebtoken`, so an expired token is reported as
/// [`ErrorKind::TokenExpired`](sis_core::ErrorKind::TokenExpired) and every
/// other failure as `TokenInvalid`.
pub struct TokenCodec {
    issuer: String,
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
    session_cap: Duration,
    rotate_after: Duration,
    leeway_seconds: i64,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("session_cap", &self.session_cap)
            .field("rotate_after", &self.rotate_after)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Creates a codec from auth configuration.
    ///
    /// Lifetimes are clamped to the bounds [`AuthConfig::validate`] enforces.
    pub fn new(config: &AuthConfig) -> Self {
        let hours = |value: u64| Duration::hours(value.min(MAX_LIFETIME_HOURS) as i64);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            issuer: config.issuer.clone(),
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            access_ttl: Duration::minutes(config.access_ttl_minutes.min(MAX_ACCESS_TTL_MINUTES) as i64),
            refresh_ttl: hours(config.refresh_ttl_hours),
            session_cap: hours(config.session_refresh_cap_hours),
            rotate_after: hours(config.refresh_rotate_after_hours),
            leeway_seconds: config.leeway_seconds.min(MAX_LEEWAY_SECONDS) as i64,
            validation,
        }
    }

    /// Issue a token of `kind` stamped with the current time.
    pub fn issue(
        &self,
        subject: Uuid,
        role: UserRole,
        remember_me: bool,
        kind: TokenKind,
    ) -> Result<IssuedToken, AppError> {
        self.issue_at(subject, role, remember_me, kind, Utc::now())
    }

    /// Issue a token of `kind` as if the clock read `now`.
    pub fn issue_at(
        &self,
        subject: Uuid,
        role: UserRole,
        remember_me: bool,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let iat = now.timestamp();
        let (lifetime, rotate_at) = match kind {
            TokenKind::Access => (self.access_ttl, None),
            TokenKind::Refresh => {
                let lifetime = self.refresh_lifetime(remember_me);
                (lifetime, Some(iat + self.rotation_offset(lifetime).num_seconds()))
            }
        };

        let claims = Claims {
            sub: subject,
            role,
            remember_me,
            rotate_at,
            kind,
            jti: Uuid::new_v4(),
            iss: self.issuer.clone(),
            iat,
            exp: iat + lifetime.num_seconds(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys(kind).encoding)
            .map_err(|e| {
                AppError::internal(format!("Failed to encode {} token: {e}", kind.as_str()))
            })?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a token of `kind` against the current time.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        self.verify_at(token, kind, Utc::now())
    }

    /// Verify a token of `kind` as if the clock read `now`.
    pub fn verify_at(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::token_invalid("invalid token signature")
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AppError::token_invalid("invalid token issuer")
                }
                _ => AppError::token_invalid(format!("invalid token: {e}")),
            })?
            .claims;

        if claims.kind != kind {
            return Err(AppError::token_invalid(format!(
                "invalid token kind: expected {} token",
                kind.as_str()
            )));
        }
        if claims.exp <= claims.iat {
            return Err(AppError::token_invalid("invalid token lifetime"));
        }
        if now.timestamp() > claims.exp + self.leeway_seconds {
            return Err(AppError::token_expired(format!(
                "{} token has expired",
                kind.as_str()
            )));
        }

        Ok(claims)
    }

    /// Remember-me sessions get the full refresh lifetime; others are capped.
    fn refresh_lifetime(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.refresh_ttl
        } else {
            self.refresh_ttl.min(self.session_cap)
        }
    }

    /// Rotation offset scaled to the lifetime actually granted.
    fn rotation_offset(&self, lifetime: Duration) -> Duration {
        let full = self.refresh_ttl.num_seconds().max(1);
        Duration::seconds(self.rotate_after.num_seconds() * lifetime.num_seconds() / full)
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sis_core::ErrorKind;

    pub(crate) fn test_config() -> AuthConfig {
        AuthConfig {
            issuer: "sis-test".into(),
            access_secret: "access-secret-for-tests".into(),
            refresh_secret: "refresh-secret-for-tests".into(),
            access_ttl_minutes: 5,
            refresh_ttl_hours: 408,
            refresh_rotate_after_hours: 336,
            session_refresh_cap_hours: 24,
            leeway_seconds: 5,
            bootstrap_key: "bootstrap-key".into(),
            default_country_code: "62".into(),
        }
    }

    #[test]
    fn test_oversized_lifetimes_are_clamped() {
        let mut config = test_config();
        config.access_ttl_minutes = u64::MAX;
        config.refresh_ttl_hours = u64::MAX;
        config.session_refresh_cap_hours = u64::MAX;
        config.refresh_rotate_after_hours = u64::MAX;
        config.leeway_seconds = u64::MAX;

        let codec = TokenCodec::new(&config);
        assert_eq!(codec.access_ttl, Duration::minutes(MAX_ACCESS_TTL_MINUTES as i64));
        assert_eq!(codec.refresh_ttl, Duration::hours(MAX_LIFETIME_HOURS as i64));
        assert_eq!(codec.leeway_seconds, MAX_LEEWAY_SECONDS as i64);
    }

    #[test]
    fn test_issue_then_verify_preserves_identity() {
        let codec = TokenCodec::new(&test_config());
        let subject = Uuid::new_v4();
        for role in [UserRole::Unset, UserRole::Student, UserRole::Teacher, UserRole::Admin] {
            for remember_me in [true, false] {
                for kind in [TokenKind::Access, TokenKind::Refresh] {
                    let issued = codec.issue(subject, role, remember_me, kind).unwrap();
                    let claims = codec.verify(&issued.token, kind).unwrap();
                    assert_eq!(claims.sub, subject);
                    assert_eq!(claims.role, role);
                    assert_eq!(claims.remember_me, remember_me);
                }
            }
        }
    }

    #[test]
    fn test_access_tokens_never_carry_rotation() {
        let codec = TokenCodec::new(&test_config());
        let issued = codec
            .issue(Uuid::new_v4(), UserRole::Admin, true, TokenKind::Access)
            .unwrap();
        assert!(issued.claims.rotate_at.is_none());
        assert_eq!(issued.claims.exp - issued.claims.iat, 5 * 60);
    }

    #[test]
    fn test_refresh_lifetime_and_rotation() {
        let codec = TokenCodec::new(&test_config());
        let remembered = codec
            .issue(Uuid::new_v4(), UserRole::Student, true, TokenKind::Refresh)
            .unwrap()
            .claims;
        assert_eq!(remembered.exp - remembered.iat, 408 * 3600);
        assert_eq!(remembered.rotate_at, Some(remembered.iat + 336 * 3600));

        let session = codec
            .issue(Uuid::new_v4(), UserRole::Student, false, TokenKind::Refresh)
            .unwrap()
            .claims;
        assert_eq!(session.exp - session.iat, 24 * 3600);
        let rotate_at = session.rotate_at.unwrap();
        assert!(rotate_at > session.iat && rotate_at <= session.exp);
    }

    #[test]
    fn test_expired_and_invalid_are_distinguished() {
        let codec = TokenCodec::new(&test_config());
        let now = Utc::now();
        let issued = codec
            .issue_at(Uuid::new_v4(), UserRole::Teacher, false, TokenKind::Access, now)
            .unwrap();

        let later = now + Duration::minutes(10);
        let err = codec.verify_at(&issued.token, TokenKind::Access, later).unwrap_err();
        assert!(err.is(ErrorKind::TokenExpired));

        let mut tampered = issued.token.clone();
        tampered.push('x');
        let err = codec.verify_at(&tampered, TokenKind::Access, now).unwrap_err();
        assert!(err.is(ErrorKind::TokenInvalid));
    }

    #[test]
    fn test_kinds_use_distinct_keys() {
        let codec = TokenCodec::new(&test_config());
        let access = codec
            .issue(Uuid::new_v4(), UserRole::Admin, false, TokenKind::Access)
            .unwrap();
        let err = codec.verify(&access.token, TokenKind::Refresh).unwrap_err();
        assert!(err.is(ErrorKind::TokenInvalid));
    }

    #[test]
    fn test_leeway_tolerates_small_skew() {
        let codec = TokenCodec::new(&test_config());
        let now = Utc::now();
        let issued = codec
            .issue_at(Uuid::new_v4(), UserRole::Admin, false, TokenKind::Access, now)
            .unwrap();
        let at_edge = now + Duration::minutes(5) + Duration::seconds(3);
        assert!(codec.verify_at(&issued.token, TokenKind::Access, at_edge).is_ok());
    }
}
