//! Denials shared by the Postgres and in-memory stores so both speak the
//! same messages and field names.

use sis_core::error::AppError;
use sis_entity::user::UserRole;

pub(crate) fn user_not_found() -> AppError {
    AppError::not_found("user not found").with_field("target_id", "user not found")
}

pub(crate) fn admin_already_exists() -> AppError {
    AppError::conflict("admin is already exist")
}

pub(crate) fn role_already_assigned(role: UserRole) -> AppError {
    AppError::conflict(format!("targeted user already has role {role}"))
        .with_field("target_id", "role already assigned")
}

pub(crate) fn class_not_found() -> AppError {
    AppError::not_found("class not found").with_field("class_id", "class not found")
}

pub(crate) fn guardian_count() -> AppError {
    AppError::conflict("existing parents must be 2").with_field("parent_ids", "must reference 2 existing parents")
}

pub(crate) fn nisn_taken() -> AppError {
    AppError::conflict("other student with same NISN already exist").with_field("nisn", "already registered")
}

pub(crate) fn subjects_missing(count: usize) -> AppError {
    let message = format!("{count} subject(s) not found");
    AppError::not_found(message.clone()).with_field("subject_ids", message)
}

pub(crate) fn teacher_ids_taken() -> AppError {
    AppError::conflict("other teacher with same NUPTK or employee id already exist")
        .with_field("nuptk", "already registered")
        .with_field("employee_id", "already registered")
}

pub(crate) fn admin_employee_id_taken() -> AppError {
    AppError::conflict("other admin with same employee id already exist")
        .with_field("employee_id", "already registered")
}
