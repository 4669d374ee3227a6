//! Domain inputs for moving an `unset` account to a functional role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{StudentProfile, TeacherProfile};
use crate::admin::AdminProfile;
use crate::user::UserRole;

/// Student enrollment: class, exactly two guardians, NISN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentEnrollment {
    pub class_id: Uuid,
    pub guardian_ids: Vec<Uuid>,
    pub nisn: String,
}

/// Teacher enrollment: subjects taught and staff identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherEnrollment {
    pub subject_ids: Vec<Uuid>,
    pub nuptk: String,
    pub employee_id: String,
    pub joined_at: DateTime<Utc>,
}

/// Admin enrollment. Grants are issued separately through the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminEnrollment {
    pub staff_role: String,
    pub employee_id: String,
    pub joined_at: DateTime<Utc>,
}

/// The role-specific data for a role assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", content = "data", rename_all = "lowercase")]
pub enum RoleAssignment {
    Student(StudentEnrollment),
    Teacher(TeacherEnrollment),
    Admin(AdminEnrollment),
}

impl RoleAssignment {
    /// The role the account ends up with.
    pub fn role(&self) -> UserRole {
        match self {
            Self::Student(_) => UserRole::Student,
            Self::Teacher(_) => UserRole::Teacher,
            Self::Admin(_) => UserRole::Admin,
        }
    }
}

/// The profile created by a role assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", content = "profile", rename_all = "lowercase")]
pub enum AssignedProfile {
    Student(StudentProfile),
    Teacher(TeacherProfile),
    Admin(AdminProfile),
}
