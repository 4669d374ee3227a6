//! Role assignment payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use sis_core::error::AppError;
use sis_entity::profile::{
    AdminEnrollment, RoleAssignment, StudentEnrollment, TeacherEnrollment,
};
use sis_entity::user::UserRole;

use super::{INVALID_PAYLOAD, validate_payload};

/// Moves an account to a functional role. Exactly the data block matching
/// `target_role` must be present.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetRolePayload {
    pub target_id: Uuid,
    pub target_role: UserRole,
    #[validate(nested)]
    pub student_data: Option<StudentData>,
    #[validate(nested)]
    pub teacher_data: Option<TeacherData>,
    #[validate(nested)]
    pub admin_data: Option<AdminData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StudentData {
    pub class_id: Uuid,
    #[validate(length(min = 2, max = 2, message = "exactly two parents are required"))]
    pub parent_ids: Vec<Uuid>,
    #[validate(length(min = 1, message = "nisn is required"))]
    pub nisn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TeacherData {
    #[validate(length(min = 1, message = "at least one subject is required"))]
    pub subject_ids: Vec<Uuid>,
    #[validate(length(min = 1, message = "nuptk is required"))]
    pub nuptk: String,
    #[validate(length(min = 1, message = "employee id is required"))]
    pub employee_id: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdminData {
    #[validate(length(min = 1, message = "staff role is required"))]
    pub staff_role: String,
    #[validate(length(min = 1, message = "employee id is required"))]
    pub employee_id: String,
    pub joined_at: DateTime<Utc>,
}

impl SetRolePayload {
    /// Validate and convert into the domain assignment.
    pub fn into_assignment(self) -> Result<(Uuid, RoleAssignment), AppError> {
        validate_payload(&self)?;

        let assignment = match self.target_role {
            UserRole::Unset => {
                return Err(AppError::validation(INVALID_PAYLOAD)
                    .with_field("target_role", "target role must be a functional role"));
            }
            UserRole::Student => {
                let data = self.student_data.ok_or_else(|| missing("student_data", "student"))?;
                RoleAssignment::Student(StudentEnrollment {
                    class_id: data.class_id,
                    guardian_ids: data.parent_ids,
                    nisn: data.nisn,
                })
            }
            UserRole::Teacher => {
                let data = self.teacher_data.ok_or_else(|| missing("teacher_data", "teacher"))?;
                RoleAssignment::Teacher(TeacherEnrollment {
                    subject_ids: data.subject_ids,
                    nuptk: data.nuptk,
                    employee_id: data.employee_id,
                    joined_at: data.joined_at,
                })
            }
            UserRole::Admin => {
                let data = self.admin_data.ok_or_else(|| missing("admin_data", "admin"))?;
                RoleAssignment::Admin(AdminEnrollment {
                    staff_role: data.staff_role,
                    employee_id: data.employee_id,
                    joined_at: data.joined_at,
                })
            }
        };

        Ok((self.target_id, assignment))
    }
}

fn missing(field: &str, role: &str) -> AppError {
    AppError::validation(INVALID_PAYLOAD)
        .with_field(field, format!("required when target_role is {role}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(target_role: UserRole) -> SetRolePayload {
        SetRolePayload {
            target_id: Uuid::new_v4(),
            target_role,
            student_data: None,
            teacher_data: None,
            admin_data: None,
        }
    }

    #[test]
    fn test_missing_data_block_names_field() {
        let err = payload(UserRole::Teacher).into_assignment().unwrap_err();
        assert_eq!(err.fields["teacher_data"], "required when target_role is teacher");
    }

    #[test]
    fn test_unset_is_not_assignable() {
        let err = payload(UserRole::Unset).into_assignment().unwrap_err();
        assert!(err.fields.contains_key("target_role"));
    }

    #[test]
    fn test_nested_errors_use_dotted_paths() {
        let mut p = payload(UserRole::Student);
        p.student_data = Some(StudentData {
            class_id: Uuid::new_v4(),
            parent_ids: vec![Uuid::new_v4()],
            nisn: "0091913711".into(),
        });
        let err = p.into_assignment().unwrap_err();
        assert_eq!(
            err.fields["student_data.parent_ids"],
            "exactly two parents are required"
        );
    }

    #[test]
    fn test_student_assignment() {
        let mut p = payload(UserRole::Student);
        let parents = vec![Uuid::new_v4(), Uuid::new_v4()];
        p.student_data = Some(StudentData {
            class_id: Uuid::new_v4(),
            parent_ids: parents.clone(),
            nisn: "0091913711".into(),
        });
        let target = p.target_id;
        let (id, assignment) = p.into_assignment().unwrap();
        assert_eq!(id, target);
        assert_eq!(assignment.role(), UserRole::Student);
        match assignment {
            RoleAssignment::Student(s) => assert_eq!(s.guardian_ids, parents),
            other => panic!("unexpected assignment {other:?}"),
        }
    }
}
