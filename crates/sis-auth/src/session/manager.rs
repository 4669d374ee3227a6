//! Session lifecycle: sign-up, sign-in, sign-out and the admin bootstrap.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::{info, warn};

use sis_core::config::AuthConfig;
use sis_core::error::AppError;
use sis_database::{AccountStore, RevocationStore};
use sis_entity::admin::AdminProfile;
use sis_entity::revoked::RevocationReason;
use sis_entity::user::{NewAccount, User};

use crate::cookie::CookieFactory;
use crate::jwt::{TokenCodec, TokenKind};
use crate::password::PasswordHasher;
use crate::payload::{
    INVALID_PAYLOAD, InitiateAdminPayload, SignInPayload, SignUpPayload, normalize_phone,
    validate_payload,
};
use crate::registry::SeedSet;

/// A started session: the account plus the access and refresh cookies.
#[derive(Debug, Clone)]
pub struct SignedSession {
    pub user: User,
    pub cookies: [Cookie<'static>; 2],
}

/// Manages the session lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    accounts: Arc<dyn AccountStore>,
    revocations: Arc<dyn RevocationStore>,
    codec: Arc<TokenCodec>,
    cookies: Arc<CookieFactory>,
    hasher: PasswordHasher,
    /// Bootstrap key and phone defaults.
    auth_config: AuthConfig,
    /// Granted to the first administrator.
    seeds: SeedSet,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("auth_config", &self.auth_config)
            .field("seeds", &self.seeds.len())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        revocations: Arc<dyn RevocationStore>,
        codec: Arc<TokenCodec>,
        cookies: Arc<CookieFactory>,
        auth_config: AuthConfig,
        seeds: SeedSet,
    ) -> Self {
        Self {
            accounts,
            revocations,
            codec,
            cookies,
            hasher: PasswordHasher::new(),
            auth_config,
            seeds,
        }
    }

    /// Register a new account in the `unset` role and start its session.
    pub async fn sign_up(&self, payload: SignUpPayload) -> Result<SignedSession, AppError> {
        validate_payload(&payload)?;
        let phone = normalize_phone(&payload.phone, &self.auth_config.default_country_code)?;
        let email = payload.email.trim().to_lowercase();

        let conflicts = self.accounts.find_conflicts(&email, &phone).await?;
        if conflicts.any() {
            let mut err = AppError::conflict(INVALID_PAYLOAD);
            if conflicts.email {
                err = err.with_field("email", "email already registered");
            }
            if conflicts.phone {
                err = err.with_field("phone", "phone number already registered");
            }
            return Err(err);
        }

        let password_hash = self.hasher.hash(&payload.password).await?;
        let user = self
            .accounts
            .create(NewAccount {
                full_name: payload.full_name.trim().to_string(),
                email,
                password_hash,
                gender: payload.gender,
                phone,
            })
            .await?;

        info!(user_id = %user.id, "Account registered");
        let cookies = self.start_session(&user, payload.remember_me)?;
        Ok(SignedSession { user, cookies })
    }

    /// Authenticate with email and password.
    pub async fn sign_in(&self, payload: SignInPayload) -> Result<SignedSession, AppError> {
        validate_payload(&payload)?;

        let user = self
            .accounts
            .find_by_email(payload.email.trim())
            .await?
            .ok_or_else(|| {
                AppError::not_found("email not registered")
                    .with_field("email", "email not registered yet")
            })?;

        if !self.hasher.verify(&payload.password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Sign-in rejected: wrong password");
            return Err(AppError::unauthorized(INVALID_PAYLOAD)
                .with_field("password", "password is incorrect"));
        }

        info!(user_id = %user.id, remember_me = payload.remember_me, "User signed in");
        let cookies = self.start_session(&user, payload.remember_me)?;
        Ok(SignedSession { user, cookies })
    }

    /// Revoke the refresh token, if it still verifies, and return the
    /// cookies that clear both tokens.
    pub async fn sign_out(&self, jar: &CookieJar) -> Result<[Cookie<'static>; 2], AppError> {
        if let Some(token) = self.cookies.token_value(jar, TokenKind::Refresh) {
            match self.codec.verify(token, TokenKind::Refresh) {
                Ok(claims) => {
                    self.revocations
                        .revoke(token, &RevocationReason::UserSignOut, claims.expires_at())
                        .await?;
                    info!(user_id = %claims.sub, "User signed out");
                }
                Err(e) => {
                    info!(kind = %e.kind, "Sign-out with unusable refresh token, clearing cookies");
                }
            }
        }
        Ok(self.cookies.removals())
    }

    /// Make `target_id` the very first administrator, holding every seed.
    pub async fn initiate_admin(
        &self,
        payload: InitiateAdminPayload,
    ) -> Result<AdminProfile, AppError> {
        validate_payload(&payload)?;

        self.accounts
            .find_by_id(payload.target_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("user with targeted id doesn't exist")
                    .with_field("target_id", "user not found")
            })?;

        if self.accounts.admin_exists().await? {
            return Err(AppError::conflict("admin is already exist"));
        }

        if !keys_match(&payload.key, &self.auth_config.bootstrap_key) {
            warn!(target_id = %payload.target_id, "Admin bootstrap rejected: invalid key");
            return Err(AppError::unauthorized(INVALID_PAYLOAD).with_field("key", "invalid key"));
        }

        let profile = self
            .accounts
            .promote_to_admin(payload.target_id, &payload.enrollment(), &self.seeds.ids())
            .await?;

        info!(
            user_id = %payload.target_id,
            grants = self.seeds.len(),
            "First administrator created"
        );
        Ok(profile)
    }

    fn start_session(&self, user: &User, remember_me: bool) -> Result<[Cookie<'static>; 2], AppError> {
        let access = self
            .codec
            .issue(user.id, user.role, remember_me, TokenKind::Access)?;
        let refresh = self
            .codec
            .issue(user.id, user.role, remember_me, TokenKind::Refresh)?;
        Ok([
            self.cookies.access_cookie(&access),
            self.cookies.refresh_cookie(&refresh),
        ])
    }
}

/// Compares every byte regardless of where the first mismatch is.
fn keys_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
