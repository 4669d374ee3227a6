//! Revocation reason codes.

use std::fmt;

/// Why a refresh token was revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationReason {
    /// The holder signed out.
    UserSignOut,
    /// Any other stored code. Shown to the caller verbatim.
    Other(String),
}

impl RevocationReason {
    /// Parse a stored reason code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "user sign out" => Self::UserSignOut,
            other => Self::Other(other.to_string()),
        }
    }

    /// The code persisted with the revocation row.
    pub fn code(&self) -> &str {
        match self {
            Self::UserSignOut => "user sign out",
            Self::Other(code) => code,
        }
    }

    /// Message surfaced to a caller presenting the revoked token.
    pub fn message(&self) -> String {
        match self {
            Self::UserSignOut => "user already signed out".to_string(),
            Self::Other(code) => code.clone(),
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
