//! Permission collections and the principal-keyed maps that own them.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::delta::SetDelta;
use crate::permission::{Permission, PermissionSet};
use crate::types::CollectionId;

/// The permissions one principal holds on one entity.
///
/// A collection has no identity until a store saves it for the first time.
/// After that it keeps its [`CollectionId`] and is mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCollection {
    id: Option<CollectionId>,
    permissions: PermissionSet,
}

impl PermissionCollection {
    /// Create an unsaved collection holding exactly `permissions`.
    pub fn new(permissions: PermissionSet) -> Self {
        Self {
            id: None,
            permissions,
        }
    }

    /// Rehydrate a saved collection.
    pub fn with_id(id: CollectionId, permissions: PermissionSet) -> Self {
        Self {
            id: Some(id),
            permissions,
        }
    }

    pub fn id(&self) -> Option<CollectionId> {
        self.id
    }

    /// Record the identity handed out by a store.
    pub fn assign_id(&mut self, id: CollectionId) {
        self.id = Some(id);
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Union `incoming` into this collection.
    pub fn grant(&mut self, incoming: &PermissionSet) -> SetDelta {
        SetDelta::union(&mut self.permissions, incoming)
    }

    /// Remove every permission in `outgoing` from this collection.
    pub fn revoke(&mut self, outgoing: &PermissionSet) -> SetDelta {
        SetDelta::difference(&mut self.permissions, outgoing)
    }
}

/// Collections keyed by principal, at most one per principal.
///
/// Each collection belongs to one principal. A clone keeps the id of the
/// collection it came from, and the stores refuse to save an entity that
/// attaches one id twice. A second principal gets its own
/// [`PermissionCollection::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap<K: Ord> {
    entries: BTreeMap<K, PermissionCollection>,
}

impl<K: Ord> Default for PermissionMap<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord> PermissionMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, principal: &K) -> Option<&PermissionCollection> {
        self.entries.get(principal)
    }

    pub fn get_mut(&mut self, principal: &K) -> Option<&mut PermissionCollection> {
        self.entries.get_mut(principal)
    }

    /// Entry API for get-or-attach in a single lookup.
    pub fn entry(&mut self, principal: K) -> btree_map::Entry<'_, K, PermissionCollection> {
        self.entries.entry(principal)
    }

    /// Attach `collection` under `principal`, returning any collection it replaced.
    pub fn attach(&mut self, principal: K, collection: PermissionCollection) -> Option<PermissionCollection> {
        self.entries.insert(principal, collection)
    }

    pub fn detach(&mut self, principal: &K) -> Option<PermissionCollection> {
        self.entries.remove(principal)
    }

    pub fn contains(&self, principal: &K) -> bool {
        self.entries.contains_key(principal)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, K, PermissionCollection> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, K, PermissionCollection> {
        self.entries.iter_mut()
    }

    pub fn principals(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}

impl<K: Ord> FromIterator<(K, PermissionCollection)> for PermissionMap<K> {
    fn from_iter<I: IntoIterator<Item = (K, PermissionCollection)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a, K: Ord> IntoIterator for &'a PermissionMap<K> {
    type Item = (&'a K, &'a PermissionCollection);
    type IntoIter = btree_map::Iter<'a, K, PermissionCollection>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    fn set(permissions: &[Permission]) -> PermissionSet {
        permissions.iter().copied().collect()
    }

    #[test]
    fn test_new_collection_is_unsaved() {
        let mut collection = PermissionCollection::new(set(&[Permission::Read]));
        assert!(!collection.is_persisted());

        collection.assign_id(CollectionId(9));
        assert_eq!(collection.id(), Some(CollectionId(9)));
    }

    #[test]
    fn test_grant_and_revoke_deltas() {
        let mut collection = PermissionCollection::new(set(&[Permission::Read]));

        assert!(collection.grant(&set(&[Permission::Read, Permission::Write])).grew());
        assert!(collection.grant(&set(&[Permission::Write])).is_unchanged());
        assert!(collection.revoke(&set(&[Permission::Read])).shrank());
        assert!(collection.revoke(&set(&[Permission::Read])).is_unchanged());
        assert_eq!(collection.permissions(), &set(&[Permission::Write]));
    }

    #[test]
    fn test_revoke_to_empty_keeps_identity() {
        let mut collection = PermissionCollection::with_id(CollectionId(1), set(&[Permission::Read]));
        collection.revoke(&set(&[Permission::Read]));

        assert!(collection.is_empty());
        assert_eq!(collection.id(), Some(CollectionId(1)));
    }

    #[test]
    fn test_map_one_collection_per_principal() {
        let mut map = PermissionMap::new();
        assert!(map
            .attach(UserId(1), PermissionCollection::new(set(&[Permission::Read])))
            .is_none());

        let replaced = map.attach(UserId(1), PermissionCollection::new(set(&[Permission::Admin])));
        assert_eq!(replaced.map(|c| c.len()), Some(1));
        assert_eq!(map.len(), 1);
        assert!(map.get(&UserId(1)).unwrap().contains(Permission::Admin));
    }
}
