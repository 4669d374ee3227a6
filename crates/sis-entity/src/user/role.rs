//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles an account can hold.
///
/// Every account starts as [`UserRole::Unset`] and is moved to one of the
/// functional roles exactly once by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Freshly registered, waiting for role assignment.
    Unset,
    /// Enrolled student.
    Student,
    /// Teaching staff.
    Teacher,
    /// Administrator. Fine-grained rights come from permission grants.
    Admin,
}

impl UserRole {
    /// The roles an account can be assigned to.
    pub const FUNCTIONAL: [UserRole; 3] = [Self::Student, Self::Teacher, Self::Admin];

    /// Whether this is the transitional role.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Check if this role is an admin.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = sis_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unset" => Ok(Self::Unset),
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "admin" => Ok(Self::Admin),
            _ => Err(sis_core::AppError::validation(format!(
                "Invalid user role: '{s}'. Expected one of: unset, student, teacher, admin"
            ))
            .with_field("role", "invalid role")),
        }
    }
}
