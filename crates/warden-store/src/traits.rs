//! Store traits: the abstract interface for permission persistence.
//!
//! The reconciler only ever calls `save_collection` and `save_entity`. The
//! lookup methods exist for the service layer and for tests.
//!
//! Implementations are synchronous. Callers run them inside whatever
//! transaction boundary they own; the traits themselves never retry.

use std::collections::HashSet;
use std::sync::Arc;

use warden_core::{
    CollectionId, EntityId, GroupId, PermissionCollection, PermissionMap, Principal,
    SecuredEntity, UserId,
};

use crate::error::{Result, StoreError};

/// Persistence of permission collections.
pub trait PermissionCollectionStore: Send + Sync {
    /// Save or update a collection.
    ///
    /// An unsaved collection is assigned a fresh [`CollectionId`]. A saved
    /// one overwrites the stored permission set under its existing id.
    fn save_collection(&self, collection: &mut PermissionCollection) -> Result<CollectionId>;

    /// Load a collection by id.
    fn find_collection(&self, id: CollectionId) -> Result<Option<PermissionCollection>>;
}

/// Persistence of secured entities and their principal mappings.
pub trait EntityStore: Send + Sync {
    /// Save or update an entity, including which collection each principal
    /// maps to.
    ///
    /// # Errors
    /// - [`StoreError::Transient`] if an attached collection has no id yet.
    /// - [`StoreError::SharedCollection`] if a collection id is attached
    ///   twice, or is already owned by another entity.
    fn save_entity(&self, entity: &mut SecuredEntity) -> Result<EntityId>;

    /// Load an entity with all its attached collections.
    fn find_entity(&self, id: EntityId) -> Result<Option<SecuredEntity>>;

    /// Delete an entity and the collections it owns.
    ///
    /// Returns `false` if no such entity existed.
    fn delete_entity(&self, id: EntityId) -> Result<bool>;

    /// All stored entity ids, ascending.
    fn list_entities(&self) -> Result<Vec<EntityId>>;
}

/// Pair every principal of `map` with the id of its collection.
///
/// Fails with [`StoreError::Transient`] on the first collection that has
/// never been saved.
pub fn attached_collection_ids<K>(map: &PermissionMap<K>) -> Result<Vec<(K, CollectionId)>>
where
    K: Ord + Copy + Into<Principal>,
{
    map.iter()
        .map(|(principal, collection)| {
            collection
                .id()
                .map(|id| (*principal, id))
                .ok_or_else(|| StoreError::Transient(Into::<Principal>::into(*principal).to_string()))
        })
        .collect()
}

/// The collection ids an entity maps its principals to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionIds {
    pub users: Vec<(UserId, CollectionId)>,
    pub groups: Vec<(GroupId, CollectionId)>,
}

impl CollectionIds {
    /// Every id, users first.
    pub fn iter(&self) -> impl Iterator<Item = CollectionId> + '_ {
        self.users
            .iter()
            .map(|(_, id)| *id)
            .chain(self.groups.iter().map(|(_, id)| *id))
    }
}

/// Collect the collection ids of both mappings of `entity`.
///
/// Fails with [`StoreError::Transient`] on a collection that was never saved
/// and with [`StoreError::SharedCollection`] when one id shows up under two
/// principals, in the same mapping or across both.
pub fn entity_collection_ids(entity: &SecuredEntity) -> Result<CollectionIds> {
    let ids = CollectionIds {
        users: attached_collection_ids(&entity.user_permissions)?,
        groups: attached_collection_ids(&entity.group_permissions)?,
    };

    let mut seen = HashSet::new();
    if let Some(shared) = ids.iter().find(|id| !seen.insert(*id)) {
        return Err(StoreError::SharedCollection(shared.to_string()));
    }
    Ok(ids)
}

impl<T: PermissionCollectionStore + ?Sized> PermissionCollectionStore for &T {
    fn save_collection(&self, collection: &mut PermissionCollection) -> Result<CollectionId> {
        (**self).save_collection(collection)
    }

    fn find_collection(&self, id: CollectionId) -> Result<Option<PermissionCollection>> {
        (**self).find_collection(id)
    }
}

impl<T: PermissionCollectionStore + ?Sized> PermissionCollectionStore for Arc<T> {
    fn save_collection(&self, collection: &mut PermissionCollection) -> Result<CollectionId> {
        (**self).save_collection(collection)
    }

    fn find_collection(&self, id: CollectionId) -> Result<Option<PermissionCollection>> {
        (**self).find_collection(id)
    }
}

impl<T: EntityStore + ?Sized> EntityStore for &T {
    fn save_entity(&self, entity: &mut SecuredEntity) -> Result<EntityId> {
        (**self).save_entity(entity)
    }

    fn find_entity(&self, id: EntityId) -> Result<Option<SecuredEntity>> {
        (**self).find_entity(id)
    }

    fn delete_entity(&self, id: EntityId) -> Result<bool> {
        (**self).delete_entity(id)
    }

    fn list_entities(&self) -> Result<Vec<EntityId>> {
        (**self).list_entities()
    }
}

impl<T: EntityStore + ?Sized> EntityStore for Arc<T> {
    fn save_entity(&self, entity: &mut SecuredEntity) -> Result<EntityId> {
        (**self).save_entity(entity)
    }

    fn find_entity(&self, id: EntityId) -> Result<Option<SecuredEntity>> {
        (**self).find_entity(id)
    }

    fn delete_entity(&self, id: EntityId) -> Result<bool> {
        (**self).delete_entity(id)
    }

    fn list_entities(&self) -> Result<Vec<EntityId>> {
        (**self).list_entities()
    }
}
