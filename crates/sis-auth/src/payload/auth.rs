//! Sign-up, sign-in and bootstrap payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use sis_entity::profile::AdminEnrollment;
use sis_entity::user::Gender;

/// Self-registration request.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct SignUpPayload {
    #[validate(length(min = 1, max = 100, message = "full name is required"))]
    pub full_name: String,
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub gender: Gender,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl std::fmt::Debug for SignUpPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpPayload")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("gender", &self.gender)
            .field("phone", &self.phone)
            .field("remember_me", &self.remember_me)
            .finish_non_exhaustive()
    }
}

/// Credential sign-in request.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct SignInPayload {
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl std::fmt::Debug for SignInPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInPayload")
            .field("email", &self.email)
            .field("remember_me", &self.remember_me)
            .finish_non_exhaustive()
    }
}

/// One-time creation of the first administrator.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct InitiateAdminPayload {
    #[validate(length(min = 1, message = "key is required"))]
    pub key: String,
    pub target_id: Uuid,
    #[validate(length(min = 1, message = "staff role is required"))]
    pub staff_role: String,
    #[validate(length(min = 1, message = "employee id is required"))]
    pub employee_id: String,
    pub joined_at: DateTime<Utc>,
}

impl InitiateAdminPayload {
    pub fn enrollment(&self) -> AdminEnrollment {
        AdminEnrollment {
            staff_role: self.staff_role.clone(),
            employee_id: self.employee_id.clone(),
            joined_at: self.joined_at,
        }
    }
}

impl std::fmt::Debug for InitiateAdminPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitiateAdminPayload")
            .field("target_id", &self.target_id)
            .field("staff_role", &self.staff_role)
            .field("employee_id", &self.employee_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::validate_payload;
    use sis_core::ErrorKind;

    #[test]
    fn test_sign_up_rules() {
        let payload = SignUpPayload {
            full_name: String::new(),
            email: "not-an-email".into(),
            password: "short".into(),
            gender: Gender::Female,
            phone: "+15550001111".into(),
            remember_me: false,
        };
        let err = validate_payload(&payload).unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert_eq!(err.fields.len(), 3);
        assert_eq!(err.fields["email"], "invalid email");
        assert!(err.fields.contains_key("password"));
        assert!(err.fields.contains_key("full_name"));
    }

    #[test]
    fn test_debug_hides_password() {
        let payload = SignInPayload {
            email: "a@b.com".into(),
            password: "super.secret871798".into(),
            remember_me: true,
        };
        assert!(validate_payload(&payload).is_ok());
        assert!(!format!("{payload:?}").contains("super.secret"));
    }
}
