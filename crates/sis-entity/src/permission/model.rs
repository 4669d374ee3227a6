//! Permission entity and its write models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::action::{ActionSet, PermissionAction};
use super::resource::PermissionResource;

/// A named bundle of actions on one resource.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: Uuid,
    /// Unique, case-sensitive name.
    pub name: String,
    /// Target resource.
    pub resource: PermissionResource,
    /// Free-text description.
    pub description: String,
    /// Granted actions, deduplicated on write.
    pub actions: Vec<PermissionAction>,
    /// Admin profile that created the permission. `None` for seeds.
    #[serde(skip_serializing)]
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// The permission's actions as a set.
    pub fn action_set(&self) -> ActionSet {
        self.actions.iter().copied().collect()
    }
}

/// Data required to create a permission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPermission {
    pub name: String,
    pub resource: PermissionResource,
    pub description: String,
    pub actions: ActionSet,
    pub author_id: Option<Uuid>,
}

/// Editable fields of a permission. Resource and actions are fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl PermissionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    /// Apply the patch to a loaded row.
    pub fn apply(&self, permission: &mut Permission) {
        if let Some(name) = &self.name {
            permission.name = name.clone();
        }
        if let Some(description) = &self.description {
            permission.description = description.clone();
        }
    }
}

/// Listing filter.
///
/// Resources and actions match any-of; `query` is a case-insensitive
/// substring match on the name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionFilter {
    #[serde(default)]
    pub resources: Vec<PermissionResource>,
    #[serde(default)]
    pub actions: Vec<PermissionAction>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub offset: u32,
}

impl PermissionFilter {
    /// Whether `permission` passes this filter. Pagination is not applied here.
    pub fn matches(&self, permission: &Permission) -> bool {
        if !self.resources.is_empty() && !self.resources.contains(&permission.resource) {
            return false;
        }
        if !self.actions.is_empty()
            && !self.actions.iter().any(|a| permission.actions.contains(a))
        {
            return false;
        }
        match &self.query {
            Some(q) if !q.is_empty() => permission
                .name
                .to_lowercase()
                .contains(&q.to_lowercase()),
            _ => true,
        }
    }
}

/// One page of a permission listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionPage {
    pub items: Vec<Permission>,
    /// Whether more rows follow this page.
    pub has_next: bool,
}
