//! Permission actions and the deduplicated action set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// CRUD verbs a permission can carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "permission_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    Create,
    Read,
    Update,
    Delete,
}

impl PermissionAction {
    /// All actions, in canonical order.
    pub const ALL: [PermissionAction; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    /// Return the action as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionAction {
    type Err = sis_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(sis_core::AppError::validation(format!(
                "Invalid permission action: '{s}'. Expected one of: create, read, update, delete"
            ))),
        }
    }
}

/// A set of actions. Duplicates collapse on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSet(BTreeSet<PermissionAction>);

impl ActionSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action.
    pub fn all() -> Self {
        PermissionAction::ALL.into_iter().collect()
    }

    pub fn contains(&self, action: PermissionAction) -> bool {
        self.0.contains(&action)
    }

    pub fn insert(&mut self, action: PermissionAction) -> bool {
        self.0.insert(action)
    }

    /// Add every action of `other` to this set.
    pub fn extend_from(&mut self, other: &ActionSet) {
        self.0.extend(other.0.iter().copied());
    }

    /// Actions of `required` absent from this set, in canonical order.
    pub fn missing(&self, required: &ActionSet) -> Vec<PermissionAction> {
        required.0.difference(&self.0).copied().collect()
    }

    /// Whether any action of `other` is in this set.
    pub fn intersects(&self, other: &ActionSet) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PermissionAction> + '_ {
        self.0.iter().copied()
    }

    /// Owned vector in canonical order, suitable for a Postgres array bind.
    pub fn to_vec(&self) -> Vec<PermissionAction> {
        self.0.iter().copied().collect()
    }
}

impl FromIterator<PermissionAction> for ActionSet {
    fn from_iter<I: IntoIterator<Item = PermissionAction>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<PermissionAction> for ActionSet {
    fn extend<I: IntoIterator<Item = PermissionAction>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl From<Vec<PermissionAction>> for ActionSet {
    fn from(actions: Vec<PermissionAction>) -> Self {
        actions.into_iter().collect()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(PermissionAction::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
