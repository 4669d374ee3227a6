//! Permission registry: CRUD plus grant and revoke.
//!
//! Every write runs inside one [`PermissionUnitOfWork`], so the checks and the
//! change they guard see the same state.

pub mod seed;

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use sis_core::error::AppError;
use sis_database::{AccountStore, PermissionStore, PermissionUnitOfWork};
use sis_entity::admin::AdminWithGrants;
use sis_entity::permission::{NewPermission, Permission, PermissionPage};

use crate::payload::{
    CreatePermissionPayload, GrantPermissionPayload, INVALID_PAYLOAD, ListPermissionsQuery,
    RevokePermissionPayload, UpdatePermissionPayload, validate_payload,
};

pub use seed::SeedSet;

/// Permissions returned per listing page.
pub const PAGE_LIMIT: u32 = 30;

#[derive(Clone)]
pub struct PermissionRegistry {
    permissions: Arc<dyn PermissionStore>,
    accounts: Arc<dyn AccountStore>,
    seeds: SeedSet,
}

impl std::fmt::Debug for PermissionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionRegistry")
            .field("seeds", &self.seeds)
            .finish_non_exhaustive()
    }
}

impl PermissionRegistry {
    pub fn new(
        permissions: Arc<dyn PermissionStore>,
        accounts: Arc<dyn AccountStore>,
        seeds: SeedSet,
    ) -> Self {
        Self {
            permissions,
            accounts,
            seeds,
        }
    }

    pub fn seeds(&self) -> &SeedSet {
        &self.seeds
    }

    /// Create a permission. `author_id` is the creating admin profile.
    pub async fn create(
        &self,
        payload: CreatePermissionPayload,
        author_id: Option<Uuid>,
    ) -> Result<Permission, AppError> {
        validate_payload(&payload)?;

        let mut tx = self.permissions.begin().await?;
        if tx.find_by_name(&payload.name).await?.is_some() {
            return Err(name_taken());
        }
        let permission = tx
            .insert(&NewPermission {
                name: payload.name,
                resource: payload.resource,
                description: payload.description,
                actions: payload.actions.into_iter().collect(),
                author_id,
            })
            .await?;
        tx.commit().await?;

        info!(
            permission_id = %permission.id,
            resource = %permission.resource,
            "Permission created"
        );
        Ok(permission)
    }

    pub async fn get(&self, id: Uuid) -> Result<Permission, AppError> {
        self.permissions
            .find_by_id(id)
            .await?
            .ok_or_else(permission_not_found)
    }

    /// One page of permissions, newest last.
    pub async fn list(&self, query: ListPermissionsQuery) -> Result<PermissionPage, AppError> {
        validate_payload(&query)?;
        let filter = query.into_filter();

        let mut items = self.permissions.list(&filter, PAGE_LIMIT + 1).await?;
        let has_next = items.len() > PAGE_LIMIT as usize;
        items.truncate(PAGE_LIMIT as usize);
        Ok(PermissionPage { items, has_next })
    }

    /// Rename or re-describe a permission. Seeds are immutable.
    pub async fn update(
        &self,
        id: Uuid,
        payload: UpdatePermissionPayload,
    ) -> Result<Permission, AppError> {
        validate_payload(&payload)?;
        let patch = payload.into_patch();

        let mut tx = self.permissions.begin().await?;
        let mut permission = tx.find_by_id(id).await?.ok_or_else(permission_not_found)?;
        if self.seeds.contains(id) {
            return Err(immutable());
        }
        if patch.is_empty() {
            return Ok(permission);
        }
        if let Some(name) = &patch.name {
            if let Some(other) = tx.find_by_name(name).await? {
                if other.id != id {
                    return Err(name_taken());
                }
            }
        }

        patch.apply(&mut permission);
        let updated = tx.update(&permission).await?;
        tx.commit().await?;

        info!(permission_id = %id, "Permission updated");
        Ok(updated)
    }

    /// Delete a permission nobody holds. Seeds are immutable.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.permissions.begin().await?;
        tx.find_by_id(id).await?.ok_or_else(permission_not_found)?;
        if self.seeds.contains(id) {
            return Err(immutable());
        }
        if tx.is_granted_to_anyone(id).await? {
            return Err(AppError::conflict("permission still granted by other admin(s)"));
        }
        tx.delete(id).await?;
        tx.commit().await?;

        info!(permission_id = %id, "Permission deleted");
        Ok(())
    }

    /// Grant a permission to an administrator.
    pub async fn grant(&self, payload: GrantPermissionPayload) -> Result<AdminWithGrants, AppError> {
        self.ensure_admin_target(payload.target_id).await?;

        let mut tx = self.permissions.begin().await?;
        let permission_id = payload.permission_id;
        let admin = load_target(&mut *tx, payload.target_id, permission_id).await?;
        if admin.holds(permission_id) {
            return Err(AppError::conflict(
                "targeted user already has permission to access the resource",
            ));
        }

        tx.append_grant(admin.profile.id, permission_id).await?;
        let updated = tx
            .find_admin_with_grants(payload.target_id)
            .await?
            .unwrap_or(admin);
        tx.commit().await?;

        info!(
            target_id = %payload.target_id,
            permission_id = %permission_id,
            "Permission granted"
        );
        Ok(updated)
    }

    /// Revoke a permission from an administrator.
    ///
    /// A seed permission can only be revoked while another administrator
    /// still holds it.
    pub async fn revoke(&self, payload: RevokePermissionPayload) -> Result<AdminWithGrants, AppError> {
        self.ensure_admin_target(payload.target_id).await?;

        let mut tx = self.permissions.begin().await?;
        let permission_id = payload.permission_id;
        let admin = load_target(&mut *tx, payload.target_id, permission_id).await?;
        if !admin.holds(permission_id) {
            return Err(AppError::conflict(
                "targeted user doesn't have permission to process",
            ));
        }
        if self.seeds.contains(permission_id)
            && !tx.has_other_holder(permission_id, admin.profile.id).await?
        {
            return Err(AppError::conflict(
                "targeted permission doesn't have another granted admin",
            ));
        }

        tx.remove_grant(admin.profile.id, permission_id).await?;
        let updated = tx
            .find_admin_with_grants(payload.target_id)
            .await?
            .unwrap_or(admin);
        tx.commit().await?;

        info!(
            target_id = %payload.target_id,
            permission_id = %permission_id,
            "Permission revoked"
        );
        Ok(updated)
    }

    /// The target must exist and be an administrator. Checked before the
    /// unit of work opens.
    async fn ensure_admin_target(&self, target_id: Uuid) -> Result<(), AppError> {
        let target = self
            .accounts
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("user not found").with_field("target_id", "user not found")
            })?;
        if !target.is_admin() {
            return Err(not_permitted_target());
        }
        Ok(())
    }
}

async fn load_target(
    tx: &mut dyn PermissionUnitOfWork,
    target_id: Uuid,
    permission_id: Uuid,
) -> Result<AdminWithGrants, AppError> {
    tx.find_by_id(permission_id).await?.ok_or_else(|| {
        permission_not_found().with_field("permission_id", "permission not found")
    })?;
    tx.find_admin_with_grants(target_id)
        .await?
        .ok_or_else(not_permitted_target)
}

fn permission_not_found() -> AppError {
    AppError::not_found("permission not found")
}

fn name_taken() -> AppError {
    AppError::conflict(INVALID_PAYLOAD)
        .with_field("name", "another permission with this name already registered")
}

fn immutable() -> AppError {
    AppError::conflict("this permission is immutable")
}

fn not_permitted_target() -> AppError {
    AppError::unprocessable("targeted user does not have a permitted role to access the resource")
}
