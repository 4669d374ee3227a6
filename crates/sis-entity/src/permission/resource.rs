//! Resource tags a permission can target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of resource classes guarded by the permission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "permission_resource", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionResource {
    Role,
    Permission,
    Admin,
    Teacher,
    Student,
    Subject,
    Class,
    Parent,
}

impl PermissionResource {
    /// All resources, in declaration order.
    pub const ALL: [PermissionResource; 8] = [
        Self::Role,
        Self::Permission,
        Self::Admin,
        Self::Teacher,
        Self::Student,
        Self::Subject,
        Self::Class,
        Self::Parent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Permission => "permission",
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
            Self::Subject => "subject",
            Self::Class => "class",
            Self::Parent => "parent",
        }
    }
}

impl fmt::Display for PermissionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionResource {
    type Err = sis_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                sis_core::AppError::validation(format!("Invalid permission resource: '{s}'"))
                    .with_field("resource", "unknown resource")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for resource in PermissionResource::ALL {
            assert_eq!(resource.as_str().parse::<PermissionResource>().unwrap(), resource);
        }
        assert!("library".parse::<PermissionResource>().is_err());
    }
}
