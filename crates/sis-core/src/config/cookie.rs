//! Session cookie configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Names and attributes of the two session cookies.
///
/// `secure` and `http_only` are independent switches. Production deployments
/// should keep both on; turning `http_only` off exposes tokens to scripts and
/// exists only for local debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie carrying the access token.
    #[serde(default = "default_access_name")]
    pub access_name: String,
    /// Cookie carrying the refresh token.
    #[serde(default = "default_refresh_name")]
    pub refresh_name: String,
    /// Cookie path attribute.
    #[serde(default = "default_path")]
    pub path: String,
    /// Emit the `Secure` attribute.
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Emit the `HttpOnly` attribute.
    #[serde(default = "default_true")]
    pub http_only: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            access_name: default_access_name(),
            refresh_name: default_refresh_name(),
            path: default_path(),
            secure: true,
            http_only: true,
        }
    }
}

impl CookieConfig {
    /// Both cookies must be distinguishable.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.access_name.is_empty() || self.refresh_name.is_empty() {
            return Err(AppError::configuration("cookie names must not be empty"));
        }
        if self.access_name == self.refresh_name {
            return Err(AppError::configuration(
                "access and refresh cookies must have distinct names",
            ));
        }
        Ok(())
    }
}

fn default_access_name() -> String {
    "access_token".to_string()
}

fn default_refresh_name() -> String {
    "refresh_token".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}
