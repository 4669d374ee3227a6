//! Unified application error types.
//!
//! Every crate maps its failures into [`AppError`] so that gates, stores and
//! the session manager all speak one language. The HTTP layer (not part of
//! this workspace) only needs [`AppError::denial`] to produce a response.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kind categorization used across the auth core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The bearer token is past its expiry.
    TokenExpired,
    /// The bearer token has a bad signature or shape.
    TokenInvalid,
    /// The refresh token was revoked server-side.
    TokenRevoked,
    /// Any other authentication failure (missing cookie, wrong password).
    Unauthorized,
    /// Valid session, but the account still holds the transitional role.
    NotActivated,
    /// Wrong role or missing permission.
    Forbidden,
    /// Duplicate entry, immutable seed, or last-holder violation.
    Conflict,
    /// The requested target or permission does not exist.
    NotFound,
    /// Payload rule violation.
    Validation,
    /// Target exists but is not in a state the operation accepts.
    Unprocessable,
    /// An internal server error occurred.
    Internal,
    /// A storage failure occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
}

impl ErrorKind {
    /// Machine-readable denial code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TokenExpired | Self::TokenInvalid | Self::TokenRevoked | Self::Unauthorized => {
                "UNAUTHORIZED"
            }
            Self::NotActivated | Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "BAD_REQUEST",
            Self::Unprocessable => "UNPROCESSABLE_ENTITY",
            Self::Internal | Self::Database | Self::Configuration => "SERVER_ERROR",
        }
    }

    /// Whether the request authenticator may recover from this failure by
    /// falling back to the refresh token.
    pub fn is_recoverable_by_refresh(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::TokenInvalid | Self::Unauthorized
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotActivated => "NOT_ACTIVATED",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Unprocessable => "UNPROCESSABLE",
            Self::Internal => "INTERNAL",
            Self::Database => "DATABASE",
            Self::Configuration => "CONFIGURATION",
        };
        f.write_str(name)
    }
}

/// Structured denial handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    /// Machine-readable code (`UNAUTHORIZED`, `FORBIDDEN`, ...).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Offending field names mapped to a per-field message.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub fields: BTreeMap<String, String>,
}

/// The unified application error.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Offending payload fields, if any.
    pub fields: BTreeMap<String, String>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: BTreeMap::new(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: BTreeMap::new(),
            source: Some(Box::new(source)),
        }
    }

    /// Attach an offending field and its message.
    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.fields.insert(field.into(), message.into());
        self
    }

    /// Create a token-expired error.
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    /// Create a token-invalid error.
    pub fn token_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenInvalid, message)
    }

    /// Create a token-revoked error.
    pub fn token_revoked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenRevoked, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a not-activated error with the standard message.
    pub fn not_activated() -> Self {
        Self::new(
            ErrorKind::NotActivated,
            "account not activated yet, please wait for admin approval",
        )
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an unprocessable error.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Render the structured denial for this error.
    ///
    /// Server-side failures never leak their message to the caller.
    pub fn denial(&self) -> Denial {
        let message = match self.kind {
            ErrorKind::Internal | ErrorKind::Database | ErrorKind::Configuration => {
                "internal server error".to_string()
            }
            _ => self.message.clone(),
        };
        Denial {
            code: self.kind.code().to_string(),
            message,
            fields: self.fields.clone(),
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            fields: self.fields.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Internal,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kinds_share_unauthorized_code() {
        for kind in [
            ErrorKind::TokenExpired,
            ErrorKind::TokenInvalid,
            ErrorKind::TokenRevoked,
            ErrorKind::Unauthorized,
        ] {
            assert_eq!(kind.code(), "UNAUTHORIZED");
        }
        assert_eq!(ErrorKind::NotActivated.code(), "FORBIDDEN");
    }

    #[test]
    fn test_denial_hides_server_messages() {
        let err = AppError::database("connection refused on 10.0.0.4");
        let denial = err.denial();
        assert_eq!(denial.code, "SERVER_ERROR");
        assert_eq!(denial.message, "internal server error");
    }

    #[test]
    fn test_denial_carries_fields() {
        let err = AppError::not_found("invalid payload").with_field("email", "email not registered yet");
        let denial = err.denial();
        assert_eq!(denial.code, "NOT_FOUND");
        assert_eq!(
            denial.fields.get("email").map(String::as_str),
            Some("email not registered yet")
        );
    }

    #[test]
    fn test_only_token_failures_fall_back_to_refresh() {
        assert!(ErrorKind::TokenExpired.is_recoverable_by_refresh());
        assert!(ErrorKind::TokenInvalid.is_recoverable_by_refresh());
        assert!(!ErrorKind::TokenRevoked.is_recoverable_by_refresh());
        assert!(!ErrorKind::Database.is_recoverable_by_refresh());
    }
}
