//! Postgres implementations of the collaborator traits.

pub mod account;
pub mod admin;
pub mod permission;
pub mod revoked;

pub use account::AccountRepository;
pub use permission::PermissionRepository;
pub use revoked::RevokedTokenRepository;

use sis_core::error::{AppError, ErrorKind};

/// Map a write failure, surfacing unique-constraint races as `Conflict`.
pub(crate) fn write_error(e: sqlx::Error, context: &str) -> AppError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        AppError::with_source(ErrorKind::Conflict, format!("{context}: duplicate entry"), e)
    } else {
        AppError::with_source(ErrorKind::Database, context.to_string(), e)
    }
}

/// Escape `LIKE` metacharacters and wrap the term for a substring match.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("class"), "%class%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
