//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use warden_core::{CollectionId, EntityId, PermissionCollection, PermissionSet, SecuredEntity};

use crate::error::{Result, StoreError};
use crate::traits::{entity_collection_ids, CollectionIds, EntityStore, PermissionCollectionStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Permission sets indexed by collection id.
    collections: HashMap<CollectionId, PermissionSet>,

    /// Entities indexed by id.
    entities: BTreeMap<EntityId, StoredEntity>,

    /// Last handed-out ids.
    last_collection_id: i64,
    last_entity_id: i64,
}

struct StoredEntity {
    name: String,
    description: Option<String>,
    collections: CollectionIds,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of stored collections, attached or not.
    pub fn collection_count(&self) -> Result<usize> {
        Ok(self.read()?.collections.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn load_collection(&self, id: CollectionId) -> Result<PermissionCollection> {
        self.collections
            .get(&id)
            .map(|permissions| PermissionCollection::with_id(id, permissions.clone()))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// First of `ids` already mapped by an entity other than `owner`.
    fn owned_elsewhere(
        &self,
        owner: Option<EntityId>,
        ids: &CollectionIds,
    ) -> Option<CollectionId> {
        self.entities
            .iter()
            .filter(|(id, _)| Some(**id) != owner)
            .flat_map(|(_, stored)| stored.collections.iter())
            .find(|taken| ids.iter().any(|id| id == *taken))
    }
}

impl PermissionCollectionStore for MemoryStore {
    fn save_collection(&self, collection: &mut PermissionCollection) -> Result<CollectionId> {
        let mut inner = self.write()?;

        let id = match collection.id() {
            Some(id) => {
                inner.last_collection_id = inner.last_collection_id.max(id.get());
                id
            }
            None => {
                inner.last_collection_id += 1;
                CollectionId(inner.last_collection_id)
            }
        };

        inner.collections.insert(id, collection.permissions().clone());
        collection.assign_id(id);

        tracing::trace!(collection = %id, size = collection.len(), "memory: saved collection");
        Ok(id)
    }

    fn find_collection(&self, id: CollectionId) -> Result<Option<PermissionCollection>> {
        let inner = self.read()?;
        Ok(inner
            .collections
            .get(&id)
            .map(|permissions| PermissionCollection::with_id(id, permissions.clone())))
    }
}

impl EntityStore for MemoryStore {
    fn save_entity(&self, entity: &mut SecuredEntity) -> Result<EntityId> {
        // Check before taking the lock so a transient entity changes nothing
        let collections = entity_collection_ids(entity)?;

        let mut inner = self.write()?;

        if let Some(taken) = inner.owned_elsewhere(entity.id(), &collections) {
            return Err(StoreError::SharedCollection(taken.to_string()));
        }

        let id = match entity.id() {
            Some(id) => {
                inner.last_entity_id = inner.last_entity_id.max(id.get());
                id
            }
            None => {
                inner.last_entity_id += 1;
                EntityId(inner.last_entity_id)
            }
        };

        inner.entities.insert(
            id,
            StoredEntity {
                name: entity.name.clone(),
                description: entity.description.clone(),
                collections,
            },
        );
        entity.assign_id(id);

        tracing::trace!(entity = %id, "memory: saved entity");
        Ok(id)
    }

    fn find_entity(&self, id: EntityId) -> Result<Option<SecuredEntity>> {
        let inner = self.read()?;

        let Some(stored) = inner.entities.get(&id) else {
            return Ok(None);
        };

        let mut entity = SecuredEntity::new(stored.name.clone());
        entity.description = stored.description.clone();
        entity.assign_id(id);

        for &(user, collection_id) in &stored.collections.users {
            entity
                .user_permissions
                .attach(user, inner.load_collection(collection_id)?);
        }
        for &(group, collection_id) in &stored.collections.groups {
            entity
                .group_permissions
                .attach(group, inner.load_collection(collection_id)?);
        }

        Ok(Some(entity))
    }

    fn delete_entity(&self, id: EntityId) -> Result<bool> {
        let mut inner = self.write()?;

        let Some(stored) = inner.entities.remove(&id) else {
            return Ok(false);
        };

        for collection_id in stored.collections.iter() {
            inner.collections.remove(&collection_id);
        }

        tracing::trace!(entity = %id, "memory: deleted entity");
        Ok(true)
    }

    fn list_entities(&self) -> Result<Vec<EntityId>> {
        Ok(self.read()?.entities.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{GroupId, Permission, UserId};

    fn set(permissions: &[Permission]) -> PermissionSet {
        permissions.iter().copied().collect()
    }

    #[test]
    fn test_save_collection_assigns_id_once() {
        let store = MemoryStore::new();
        let mut collection = PermissionCollection::new(set(&[Permission::Read]));

        let id = store.save_collection(&mut collection).unwrap();
        assert_eq!(collection.id(), Some(id));

        collection.grant(&set(&[Permission::Write]));
        let again = store.save_collection(&mut collection).unwrap();
        assert_eq!(again, id);

        let loaded = store.find_collection(id).unwrap().unwrap();
        assert_eq!(loaded.permissions(), &set(&[Permission::Read, Permission::Write]));
        assert_eq!(store.collection_count().unwrap(), 1);
    }

    #[test]
    fn test_entity_roundtrip_with_collections() {
        let store = MemoryStore::new();
        let mut collection = PermissionCollection::new(set(&[Permission::Admin]));
        store.save_collection(&mut collection).unwrap();

        let mut entity = SecuredEntity::new("parcels").with_description("cadastre");
        entity.group_permissions.attach(GroupId(8), collection);
        let id = store.save_entity(&mut entity).unwrap();

        let loaded = store.find_entity(id).unwrap().unwrap();
        assert_eq!(loaded, entity);
    }

    #[test]
    fn test_transient_collection_rejected() {
        let store = MemoryStore::new();
        let mut entity = SecuredEntity::new("parcels");
        entity
            .user_permissions
            .attach(UserId(1), PermissionCollection::new(set(&[Permission::Read])));

        let err = store.save_entity(&mut entity).unwrap_err();
        assert!(matches!(err, StoreError::Transient(_)));
        assert!(!entity.is_persisted());
        assert!(store.list_entities().unwrap().is_empty());
    }

    #[test]
    fn test_delete_entity_removes_owned_collections() {
        let store = MemoryStore::new();
        let mut collection = PermissionCollection::new(set(&[Permission::Read]));
        let collection_id = store.save_collection(&mut collection).unwrap();

        let mut entity = SecuredEntity::new("rivers");
        entity.user_permissions.attach(UserId(2), collection);
        let id = store.save_entity(&mut entity).unwrap();

        assert!(store.delete_entity(id).unwrap());
        assert!(!store.delete_entity(id).unwrap());
        assert!(store.find_entity(id).unwrap().is_none());
        assert!(store.find_collection(collection_id).unwrap().is_none());
    }

    #[test]
    fn test_collection_shared_between_principals_rejected() {
        let store = MemoryStore::new();
        let mut collection = PermissionCollection::new(set(&[Permission::Read]));
        store.save_collection(&mut collection).unwrap();

        let mut entity = SecuredEntity::new("rivers");
        entity.user_permissions.attach(UserId(1), collection.clone());
        entity.user_permissions.attach(UserId(2), collection);

        let err = store.save_entity(&mut entity).unwrap_err();
        assert!(matches!(err, StoreError::SharedCollection(_)));
        assert!(!entity.is_persisted());
        assert!(store.list_entities().unwrap().is_empty());
    }

    #[test]
    fn test_collection_shared_between_entities_rejected() {
        let store = MemoryStore::new();
        let mut collection = PermissionCollection::new(set(&[Permission::Read]));
        store.save_collection(&mut collection).unwrap();

        let mut first = SecuredEntity::new("rivers");
        first.user_permissions.attach(UserId(1), collection.clone());
        let first_id = store.save_entity(&mut first).unwrap();

        let mut second = SecuredEntity::new("lakes");
        second.group_permissions.attach(GroupId(1), collection);
        let err = store.save_entity(&mut second).unwrap_err();
        assert!(matches!(err, StoreError::SharedCollection(_)));
        assert_eq!(store.list_entities().unwrap(), vec![first_id]);

        // Re-saving the owner is fine
        assert_eq!(store.save_entity(&mut first).unwrap(), first_id);
    }
}
