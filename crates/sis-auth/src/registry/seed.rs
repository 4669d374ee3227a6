//! Bootstrap permissions planted at first start.

use std::collections::BTreeSet;

use tracing::info;
use uuid::Uuid;

use sis_core::error::AppError;
use sis_database::PermissionStore;
use sis_entity::permission::{ActionSet, NewPermission, PermissionResource};

/// Ids of the seed permissions. Seeds cannot be edited or deleted, and the
/// last holder of a seed cannot lose it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSet(BTreeSet<Uuid>);

impl SeedSet {
    pub fn contains(&self, permission_id: Uuid) -> bool {
        self.0.contains(&permission_id)
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.0.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Uuid> for SeedSet {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Name of the seed permission for `resource`.
pub fn seed_name(resource: PermissionResource) -> String {
    format!("{resource} full manage")
}

/// One full-access permission per resource.
pub fn seed_permissions() -> Vec<NewPermission> {
    PermissionResource::ALL
        .iter()
        .map(|&resource| NewPermission {
            name: seed_name(resource),
            resource,
            description: format!("create, read, update and delete any {resource}"),
            actions: ActionSet::all(),
            author_id: None,
        })
        .collect()
}

/// Insert any missing seed permission and return the ids of all of them.
/// Running it again is a no-op.
pub async fn plant(store: &dyn PermissionStore) -> Result<SeedSet, AppError> {
    let mut tx = store.begin().await?;
    let mut ids = BTreeSet::new();
    let mut planted = 0usize;

    for seed in seed_permissions() {
        let id = match tx.find_by_name(&seed.name).await? {
            Some(existing) => existing.id,
            None => {
                planted += 1;
                tx.insert(&seed).await?.id
            }
        };
        ids.insert(id);
    }
    tx.commit().await?;

    info!(planted, total = ids.len(), "Seed permissions ready");
    Ok(SeedSet(ids))
}
