//! Secured entities.

use serde::{Deserialize, Serialize};

use crate::collection::{PermissionCollection, PermissionMap};
use crate::types::{EntityId, GroupId, Principal, UserId};

/// An entity whose access is governed by per-user and per-group permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuredEntity {
    id: Option<EntityId>,

    /// Human-readable name.
    pub name: String,

    /// Optional free-form description.
    pub description: Option<String>,

    /// Collections keyed by user.
    pub user_permissions: PermissionMap<UserId>,

    /// Collections keyed by user group.
    pub group_permissions: PermissionMap<GroupId>,
}

impl SecuredEntity {
    /// Create an unsaved entity with no permissions attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            user_permissions: PermissionMap::new(),
            group_permissions: PermissionMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Record the identity handed out by a store.
    pub fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Look up the collection for any principal.
    pub fn permissions_of(&self, principal: Principal) -> Option<&PermissionCollection> {
        match principal {
            Principal::User(id) => self.user_permissions.get(&id),
            Principal::Group(id) => self.group_permissions.get(&id),
        }
    }

    /// All attached collections, users first.
    pub fn collections(&self) -> impl Iterator<Item = (Principal, &PermissionCollection)> {
        let users = self
            .user_permissions
            .iter()
            .map(|(id, c)| (Principal::User(*id), c));
        let groups = self
            .group_permissions
            .iter()
            .map(|(id, c)| (Principal::Group(*id), c));
        users.chain(groups)
    }
}
