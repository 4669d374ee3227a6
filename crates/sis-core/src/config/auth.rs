//! Authentication configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Upper bound for `access_ttl_minutes`: one day.
pub const MAX_ACCESS_TTL_MINUTES: u64 = 24 * 60;
/// Upper bound for every hour-based lifetime: about ten years.
pub const MAX_LIFETIME_HOURS: u64 = 24 * 366 * 10;
/// Upper bound for `leeway_seconds`.
pub const MAX_LEEWAY_SECONDS: u64 = 300;

/// Token lifetimes, signing secrets, and bootstrap credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Issuer claim stamped on every token.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// HMAC secret for access tokens.
    pub access_secret: String,
    /// HMAC secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Refresh token TTL in hours for remember-me sessions.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_hours: u64,
    /// Offset from issuance after which a refresh token is silently rotated.
    #[serde(default = "default_rotate_after")]
    pub refresh_rotate_after_hours: u64,
    /// Refresh token TTL cap in hours for sessions without remember-me.
    #[serde(default = "default_session_cap")]
    pub session_refresh_cap_hours: u64,
    /// Clock-skew leeway in seconds applied to expiry checks.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
    /// One-time key required to create the very first administrator.
    pub bootstrap_key: String,
    /// Country calling code applied to phone numbers written in national form.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_hours", &self.refresh_ttl_hours)
            .field("refresh_rotate_after_hours", &self.refresh_rotate_after_hours)
            .field("session_refresh_cap_hours", &self.session_refresh_cap_hours)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    /// Validate secrets and lifetimes.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(AppError::configuration("signing secrets must not be empty"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(AppError::configuration(
                "access and refresh tokens must use distinct signing secrets",
            ));
        }
        if self.access_ttl_minutes == 0
            || self.refresh_ttl_hours == 0
            || self.session_refresh_cap_hours == 0
        {
            return Err(AppError::configuration("token lifetimes must be positive"));
        }
        if self.access_ttl_minutes > MAX_ACCESS_TTL_MINUTES {
            return Err(AppError::configuration(format!(
                "access_ttl_minutes must not exceed {MAX_ACCESS_TTL_MINUTES}"
            )));
        }
        if self.refresh_ttl_hours > MAX_LIFETIME_HOURS
            || self.session_refresh_cap_hours > MAX_LIFETIME_HOURS
        {
            return Err(AppError::configuration(format!(
                "refresh lifetimes must not exceed {MAX_LIFETIME_HOURS} hours"
            )));
        }
        if self.leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(AppError::configuration(format!(
                "leeway_seconds must not exceed {MAX_LEEWAY_SECONDS}"
            )));
        }
        if self.refresh_rotate_after_hours == 0
            || self.refresh_rotate_after_hours > self.refresh_ttl_hours
        {
            return Err(AppError::configuration(format!(
                "refresh_rotate_after_hours must be within 1..={}",
                self.refresh_ttl_hours
            )));
        }
        if self.bootstrap_key.trim().is_empty() {
            return Err(AppError::configuration("bootstrap_key must not be empty"));
        }
        Ok(())
    }
}

fn default_issuer() -> String {
    "school-information-system".to_string()
}

fn default_access_ttl() -> u64 {
    5
}

// 2 weeks 3 days
fn default_refresh_ttl() -> u64 {
    408
}

// 2 weeks
fn default_rotate_after() -> u64 {
    336
}

fn default_session_cap() -> u64 {
    24
}

fn default_leeway() -> u64 {
    5
}

fn default_country_code() -> String {
    "62".to_string()
}
