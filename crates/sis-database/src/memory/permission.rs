use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use sis_core::error::AppError;
use sis_core::result::AppResult;
use sis_entity::admin::AdminWithGrants;
use sis_entity::permission::{NewPermission, Permission, PermissionFilter};

use super::{MemoryState, MemoryStore};
use crate::store::{PermissionStore, PermissionUnitOfWork};

impl MemoryState {
    fn admin_with_grants(&self, user_id: Uuid) -> Option<AdminWithGrants> {
        let profile = self.admin_by_user(user_id)?.clone();
        let mut grants: Vec<Permission> = self
            .grants
            .iter()
            .filter(|(admin_id, _)| *admin_id == profile.id)
            .filter_map(|(_, permission_id)| self.permissions.get(permission_id).cloned())
            .collect();
        grants.sort_by_key(|p| p.created_at);
        Some(AdminWithGrants { profile, grants })
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Permission>> {
        Ok(self.state.lock().await.permissions.get(&id).cloned())
    }

    async fn list(&self, filter: &PermissionFilter, limit: u32) -> AppResult<Vec<Permission>> {
        let state = self.state.lock().await;
        let mut matching: Vec<Permission> = state
            .permissions
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_admin_with_grants(&self, user_id: Uuid) -> AppResult<Option<AdminWithGrants>> {
        Ok(self.state.lock().await.admin_with_grants(user_id))
    }

    async fn begin(&self) -> AppResult<Box<dyn PermissionUnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryPermissionTx { guard, working }))
    }
}

/// Holds the store lock for its whole life and edits a private copy that
/// replaces the shared state on commit.
struct MemoryPermissionTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl PermissionUnitOfWork for MemoryPermissionTx {
    async fn find_by_id(&mut self, id: Uuid) -> AppResult<Option<Permission>> {
        Ok(self.working.permissions.get(&id).cloned())
    }

    async fn find_by_name(&mut self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .working
            .permissions
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn insert(&mut self, new: &NewPermission) -> AppResult<Permission> {
        if self.working.permissions.values().any(|p| p.name == new.name) {
            return Err(AppError::conflict("Failed to create permission: duplicate entry"));
        }
        let now = Utc::now();
        let permission = Permission {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            resource: new.resource,
            description: new.description.clone(),
            actions: new.actions.to_vec(),
            author_id: new.author_id,
            created_at: now,
            updated_at: now,
        };
        self.working.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn update(&mut self, permission: &Permission) -> AppResult<Permission> {
        if self
            .working
            .permissions
            .values()
            .any(|p| p.name == permission.name && p.id != permission.id)
        {
            return Err(AppError::conflict("Failed to update permission: duplicate entry"));
        }
        let stored = self
            .working
            .permissions
            .get_mut(&permission.id)
            .ok_or_else(|| AppError::not_found("permission not found"))?;
        stored.name = permission.name.clone();
        stored.description = permission.description.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&mut self, id: Uuid) -> AppResult<()> {
        if self.working.grants.iter().any(|(_, p)| *p == id) {
            return Err(AppError::database("permission is still referenced by grants"));
        }
        self.working.permissions.remove(&id);
        Ok(())
    }

    async fn is_granted_to_anyone(&mut self, permission_id: Uuid) -> AppResult<bool> {
        Ok(self.working.grants.iter().any(|(_, p)| *p == permission_id))
    }

    async fn find_admin_with_grants(&mut self, user_id: Uuid) -> AppResult<Option<AdminWithGrants>> {
        Ok(self.working.admin_with_grants(user_id))
    }

    async fn has_other_holder(&mut self, permission_id: Uuid, excluding_admin: Uuid) -> AppResult<bool> {
        let state = &self.working;
        Ok(state.grants.iter().any(|(admin_id, p)| {
            *p == permission_id
                && *admin_id != excluding_admin
                && state
                    .admins
                    .get(admin_id)
                    .is_some_and(|admin| state.live_user(admin.user_id).is_some())
        }))
    }

    async fn append_grant(&mut self, admin_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        if !self.working.admins.contains_key(&admin_id)
            || !self.working.permissions.contains_key(&permission_id)
        {
            return Err(AppError::not_found("grant references a missing admin or permission"));
        }
        self.working.grants.insert((admin_id, permission_id));
        Ok(())
    }

    async fn remove_grant(&mut self, admin_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        self.working.grants.remove(&(admin_id, permission_id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryPermissionTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sis_entity::permission::{ActionSet, PermissionAction, PermissionResource};

    fn new_permission(name: &str, resource: PermissionResource) -> NewPermission {
        NewPermission {
            name: name.into(),
            resource,
            description: "test permission".into(),
            actions: [PermissionAction::Read].into_iter().collect::<ActionSet>(),
            author_id: None,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_changes_are_discarded() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(&new_permission("class reader", PermissionResource::Class))
                .await
                .unwrap();
        }
        assert!(store.list(&PermissionFilter::default(), 10).await.unwrap().is_empty());

        let mut tx = store.begin().await.unwrap();
        tx.insert(&new_permission("class reader", PermissionResource::Class))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.list(&PermissionFilter::default(), 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert(&new_permission("Class Reader", PermissionResource::Class)).await.unwrap();
        tx.insert(&new_permission("class auditor", PermissionResource::Class)).await.unwrap();
        tx.insert(&new_permission("subject reader", PermissionResource::Subject)).await.unwrap();
        tx.commit().await.unwrap();

        let by_name = PermissionFilter {
            query: Some("CLASS".into()),
            ..Default::default()
        };
        assert_eq!(store.list(&by_name, 10).await.unwrap().len(), 2);

        let by_resource = PermissionFilter {
            resources: vec![PermissionResource::Subject],
            ..Default::default()
        };
        let found = store.list(&by_resource, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "subject reader");

        let by_action = PermissionFilter {
            actions: vec![PermissionAction::Delete],
            ..Default::default()
        };
        assert!(store.list(&by_action, 10).await.unwrap().is_empty());

        let second_page = PermissionFilter {
            offset: 2,
            ..Default::default()
        };
        assert_eq!(store.list(&second_page, 10).await.unwrap().len(), 1);
        assert_eq!(store.list(&PermissionFilter::default(), 2).await.unwrap().len(), 2);
    }
}
