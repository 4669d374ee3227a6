//! Admin profile and grant queries shared by the account and permission
//! repositories.
//!
//! Every function takes a `&mut PgConnection` so callers decide whether it
//! runs on a pooled connection or inside an open transaction.

use sqlx::PgConnection;
use uuid::Uuid;

use sis_core::error::{AppError, ErrorKind};
use sis_core::result::AppResult;
use sis_entity::admin::{AdminProfile, AdminWithGrants};
use sis_entity::permission::Permission;
use sis_entity::profile::AdminEnrollment;

use super::write_error;

/// Load the admin profile of an account with all granted permissions.
pub(crate) async fn load_with_grants(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<Option<AdminWithGrants>> {
    let profile = sqlx::query_as::<_, AdminProfile>("SELECT * FROM admins WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find admin profile", e))?;

    let Some(profile) = profile else {
        return Ok(None);
    };

    let grants = sqlx::query_as::<_, Permission>(
        "SELECT p.* FROM permissions p \
         JOIN admin_permissions ap ON ap.permission_id = p.id \
         WHERE ap.admin_id = $1 ORDER BY p.created_at",
    )
    .bind(profile.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load admin grants", e))?;

    Ok(Some(AdminWithGrants { profile, grants }))
}

/// Whether another admin uses the employee id.
pub(crate) async fn employee_id_taken(conn: &mut PgConnection, employee_id: &str) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM admins WHERE employee_id = $1)")
        .bind(employee_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check admin employee id", e)
        })
}

pub(crate) async fn insert_profile(
    conn: &mut PgConnection,
    user_id: Uuid,
    enrollment: &AdminEnrollment,
) -> AppResult<AdminProfile> {
    sqlx::query_as::<_, AdminProfile>(
        "INSERT INTO admins (user_id, staff_role, employee_id, joined_at) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(user_id)
    .bind(&enrollment.staff_role)
    .bind(&enrollment.employee_id)
    .bind(enrollment.joined_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| write_error(e, "Failed to create admin profile"))
}

pub(crate) async fn append_grant(
    conn: &mut PgConnection,
    admin_id: Uuid,
    permission_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO admin_permissions (admin_id, permission_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(admin_id)
    .bind(permission_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error(e, "Failed to grant permission"))?;
    Ok(())
}
