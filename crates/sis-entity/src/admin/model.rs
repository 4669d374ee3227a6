//! Administrator profile and its loaded grant set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::permission::{ActionSet, Permission, PermissionResource};

/// Staff details attached to an account holding the `admin` role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminProfile {
    /// Profile identifier. Grants reference this, not the account id.
    pub id: Uuid,
    /// Owning account.
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    /// Free-text job title, e.g. `"developer"`.
    pub staff_role: String,
    /// Employee number, unique among admins.
    pub employee_id: String,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An administrator together with every permission granted to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminWithGrants {
    pub profile: AdminProfile,
    pub grants: Vec<Permission>,
}

impl AdminWithGrants {
    /// Union of the action sets of every grant on `resource`.
    pub fn actions_for(&self, resource: PermissionResource) -> ActionSet {
        let mut set = ActionSet::new();
        for grant in self.grants.iter().filter(|g| g.resource == resource) {
            set.extend(grant.actions.iter().copied());
        }
        set
    }

    /// Whether the permission is among the grants.
    pub fn holds(&self, permission_id: Uuid) -> bool {
        self.grants.iter().any(|g| g.id == permission_id)
    }

    pub fn user_id(&self) -> Uuid {
        self.profile.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionAction::*;

    fn permission(resource: PermissionResource, actions: Vec<crate::permission::PermissionAction>) -> Permission {
        Permission {
            id: Uuid::new_v4(),
            name: format!("{resource} grant {}", Uuid::new_v4()),
            resource,
            description: String::new(),
            actions,
            author_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn admin(grants: Vec<Permission>) -> AdminWithGrants {
        AdminWithGrants {
            profile: AdminProfile {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                staff_role: "registrar".into(),
                employee_id: "EMP-1".into(),
                joined_at: Utc::now(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            grants,
        }
    }

    #[test]
    fn test_actions_union_across_grants() {
        let a = admin(vec![
            permission(PermissionResource::Class, vec![Read]),
            permission(PermissionResource::Class, vec![Update, Read]),
            permission(PermissionResource::Student, vec![Delete]),
        ]);
        let set = a.actions_for(PermissionResource::Class);
        assert_eq!(set.to_vec(), vec![Read, Update]);
        assert!(a.actions_for(PermissionResource::Role).is_empty());
    }

    #[test]
    fn test_holds_by_id() {
        let p = permission(PermissionResource::Subject, vec![Read]);
        let id = p.id;
        let a = admin(vec![p]);
        assert!(a.holds(id));
        assert!(!a.holds(Uuid::new_v4()));
    }
}
