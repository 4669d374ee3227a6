//! Permission registry payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use sis_entity::permission::{
    PermissionAction, PermissionFilter, PermissionPatch, PermissionResource,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePermissionPayload {
    #[validate(length(min = 10, max = 100, message = "name must be 10 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 10, message = "description must be at least 10 characters"))]
    pub description: String,
    pub resource: PermissionResource,
    #[validate(length(min = 1, message = "at least one action is required"))]
    pub actions: Vec<PermissionAction>,
}

/// Only name and description are editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePermissionPayload {
    #[validate(length(min = 10, max = 100, message = "name must be 10 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 10, message = "description must be at least 10 characters"))]
    pub description: Option<String>,
}

impl UpdatePermissionPayload {
    pub fn into_patch(self) -> PermissionPatch {
        PermissionPatch {
            name: self.name,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantPermissionPayload {
    pub target_id: Uuid,
    pub permission_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokePermissionPayload {
    pub target_id: Uuid,
    pub permission_id: Uuid,
}

/// Listing query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ListPermissionsQuery {
    #[serde(default)]
    pub resources: Vec<PermissionResource>,
    #[serde(default)]
    pub actions: Vec<PermissionAction>,
    #[validate(length(max = 100, message = "query is too long"))]
    pub q: Option<String>,
    #[serde(default)]
    pub offset: u32,
}

impl ListPermissionsQuery {
    pub fn into_filter(self) -> PermissionFilter {
        PermissionFilter {
            resources: self.resources,
            actions: self.actions,
            query: self.q.filter(|q| !q.trim().is_empty()),
            offset: self.offset,
        }
    }
}
