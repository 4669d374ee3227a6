//! Request payloads with declarative validation rules.
//!
//! Each payload derives [`Validate`]; [`validate_payload`] turns the
//! collected violations into a single `Validation` error whose field map
//! uses dotted paths for nested payloads (`student_data.nisn`).

pub mod auth;
pub mod permission;
pub mod phone;
pub mod role;

use std::collections::BTreeMap;

use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use sis_core::error::AppError;

pub use auth::{InitiateAdminPayload, SignInPayload, SignUpPayload};
pub use permission::{
    CreatePermissionPayload, GrantPermissionPayload, ListPermissionsQuery,
    RevokePermissionPayload, UpdatePermissionPayload,
};
pub use phone::normalize_phone;
pub use role::{AdminData, SetRolePayload, StudentData, TeacherData};

/// Message shared by every payload rejection; details go in the field map.
pub const INVALID_PAYLOAD: &str = "invalid payload";

/// Run a payload's rules, mapping violations to `ErrorKind::Validation`.
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|errors| {
        let mut fields = BTreeMap::new();
        collect(&errors, "", &mut fields);
        let mut err = AppError::validation(INVALID_PAYLOAD);
        err.fields = fields;
        err
    })
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (field, kind) in errors.errors() {
        let path = format!("{prefix}{field}");
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(first) = list.first() {
                    out.insert(path, describe(first));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &format!("{path}."), out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{path}[{index}]."), out);
                }
            }
        }
    }
}

fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "email" => "invalid email".to_string(),
        "length" => "invalid length".to_string(),
        "required" => "field is required".to_string(),
        other => format!("failed {other} check"),
    }
}
