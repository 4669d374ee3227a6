//! Permission and grant repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use sis_core::error::{AppError, ErrorKind};
use sis_core::result::AppResult;
use sis_entity::admin::AdminWithGrants;
use sis_entity::permission::{NewPermission, Permission, PermissionFilter};

use super::{admin, contains_pattern, write_error};
use crate::store::{PermissionStore, PermissionUnitOfWork};

/// Postgres-backed [`PermissionStore`].
#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PermissionRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find permission", e))
    }

    async fn list(&self, filter: &PermissionFilter, limit: u32) -> AppResult<Vec<Permission>> {
        let query = filter
            .query
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(contains_pattern);

        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions \
             WHERE (cardinality($1::permission_resource[]) = 0 OR resource = ANY($1)) \
             AND (cardinality($2::permission_action[]) = 0 OR actions && $2) \
             AND ($3::text IS NULL OR name ILIKE $3) \
             ORDER BY created_at, name \
             LIMIT $4 OFFSET $5",
        )
        .bind(&filter.resources)
        .bind(&filter.actions)
        .bind(query)
        .bind(i64::from(limit))
        .bind(i64::from(filter.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list permissions", e))
    }

    async fn find_admin_with_grants(&self, user_id: Uuid) -> AppResult<Option<AdminWithGrants>> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e)
        })?;
        admin::load_with_grants(&mut conn, user_id).await
    }

    async fn begin(&self) -> AppResult<Box<dyn PermissionUnitOfWork>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        Ok(Box::new(PgPermissionTx { tx }))
    }
}

/// A registry mutation running inside one Postgres transaction.
struct PgPermissionTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PermissionUnitOfWork for PgPermissionTx {
    async fn find_by_id(&mut self, id: Uuid) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find permission", e))
    }

    async fn find_by_name(&mut self, name: &str) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find permission by name", e)
            })
    }

    async fn insert(&mut self, permission: &NewPermission) -> AppResult<Permission> {
        sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions (name, resource, description, actions, author_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&permission.name)
        .bind(permission.resource)
        .bind(&permission.description)
        .bind(permission.actions.to_vec())
        .bind(permission.author_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to create permission"))
    }

    async fn update(&mut self, permission: &Permission) -> AppResult<Permission> {
        sqlx::query_as::<_, Permission>(
            "UPDATE permissions SET name = $2, description = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(permission.id)
        .bind(&permission.name)
        .bind(&permission.description)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to update permission"))
    }

    async fn delete(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error(e, "Failed to delete permission"))?;
        Ok(())
    }

    async fn is_granted_to_anyone(&mut self, permission_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM admin_permissions WHERE permission_id = $1)",
        )
        .bind(permission_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check grants", e))
    }

    async fn find_admin_with_grants(&mut self, user_id: Uuid) -> AppResult<Option<AdminWithGrants>> {
        admin::load_with_grants(&mut self.tx, user_id).await
    }

    async fn has_other_holder(&mut self, permission_id: Uuid, excluding_admin: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM admin_permissions ap \
             JOIN admins a ON a.id = ap.admin_id \
             JOIN users u ON u.id = a.user_id \
             WHERE ap.permission_id = $1 AND ap.admin_id <> $2 AND u.deleted_at IS NULL)",
        )
        .bind(permission_id)
        .bind(excluding_admin)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check other grant holders", e)
        })
    }

    async fn append_grant(&mut self, admin_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        admin::append_grant(&mut self.tx, admin_id, permission_id).await
    }

    async fn remove_grant(&mut self, admin_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM admin_permissions WHERE admin_id = $1 AND permission_id = $2")
            .bind(admin_id)
            .bind(permission_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke grant", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })
    }
}
