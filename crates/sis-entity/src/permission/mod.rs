//! Permission domain entities.

pub mod action;
pub mod model;
pub mod resource;

pub use action::{ActionSet, PermissionAction};
pub use model::{NewPermission, Permission, PermissionFilter, PermissionPage, PermissionPatch};
pub use resource::PermissionResource;
