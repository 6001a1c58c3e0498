//! A store wrapper that records every call.
//!
//! Tests use the journal to assert how many saves a reconciliation issued
//! and in which order, and flip the failure switches to exercise error
//! propagation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use warden_core::{CollectionId, EntityId, PermissionCollection, PermissionSet, SecuredEntity};
use warden_store::{EntityStore, PermissionCollectionStore, Result, StoreError};

/// One call made against a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `save_collection`, with the collection's id and set as passed in.
    SaveCollection {
        id: Option<CollectionId>,
        permissions: PermissionSet,
    },
    FindCollection(CollectionId),
    /// `save_entity`, with the entity's id as passed in.
    SaveEntity { id: Option<EntityId> },
    FindEntity(EntityId),
    DeleteEntity(EntityId),
    ListEntities,
}

impl StoreCall {
    pub fn is_collection_save(&self) -> bool {
        matches!(self, StoreCall::SaveCollection { .. })
    }

    pub fn is_entity_save(&self) -> bool {
        matches!(self, StoreCall::SaveEntity { .. })
    }
}

/// Wraps a store and journals every call made through it.
pub struct RecordingStore<S> {
    inner: S,
    journal: Mutex<Vec<StoreCall>>,
    fail_collection_saves: AtomicBool,
    fail_entity_saves: AtomicBool,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            journal: Mutex::new(Vec::new()),
            fail_collection_saves: AtomicBool::new(false),
            fail_entity_saves: AtomicBool::new(false),
        }
    }

    /// The wrapped store. Calls made directly on it are not recorded.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Snapshot of the journal.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.journal().clone()
    }

    /// Only the save calls, in order.
    pub fn saves_in_order(&self) -> Vec<StoreCall> {
        self.journal()
            .iter()
            .filter(|call| call.is_collection_save() || call.is_entity_save())
            .cloned()
            .collect()
    }

    /// `(collection saves, entity saves)` recorded so far.
    pub fn saves(&self) -> (usize, usize) {
        let journal = self.journal();
        (
            journal.iter().filter(|c| c.is_collection_save()).count(),
            journal.iter().filter(|c| c.is_entity_save()).count(),
        )
    }

    pub fn clear(&self) {
        self.journal().clear();
    }

    /// Make every following `save_collection` fail with
    /// [`StoreError::Unavailable`]. Failed calls are still recorded.
    pub fn fail_collection_saves(&self, fail: bool) {
        self.fail_collection_saves.store(fail, Ordering::SeqCst);
    }

    /// Same as [`fail_collection_saves`](Self::fail_collection_saves) for
    /// `save_entity`.
    pub fn fail_entity_saves(&self, fail: bool) {
        self.fail_entity_saves.store(fail, Ordering::SeqCst);
    }

    fn journal(&self) -> MutexGuard<'_, Vec<StoreCall>> {
        // A panicking test thread must not hide the calls made before it
        self.journal.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: StoreCall) {
        self.journal().push(call);
    }
}

impl<S: PermissionCollectionStore> PermissionCollectionStore for RecordingStore<S> {
    fn save_collection(&self, collection: &mut PermissionCollection) -> Result<CollectionId> {
        self.record(StoreCall::SaveCollection {
            id: collection.id(),
            permissions: collection.permissions().clone(),
        });
        if self.fail_collection_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected collection save failure".into()));
        }
        self.inner.save_collection(collection)
    }

    fn find_collection(&self, id: CollectionId) -> Result<Option<PermissionCollection>> {
        self.record(StoreCall::FindCollection(id));
        self.inner.find_collection(id)
    }
}

impl<S: EntityStore> EntityStore for RecordingStore<S> {
    fn save_entity(&self, entity: &mut SecuredEntity) -> Result<EntityId> {
        self.record(StoreCall::SaveEntity { id: entity.id() });
        if self.fail_entity_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected entity save failure".into()));
        }
        self.inner.save_entity(entity)
    }

    fn find_entity(&self, id: EntityId) -> Result<Option<SecuredEntity>> {
        self.record(StoreCall::FindEntity(id));
        self.inner.find_entity(id)
    }

    fn delete_entity(&self, id: EntityId) -> Result<bool> {
        self.record(StoreCall::DeleteEntity(id));
        self.inner.delete_entity(id)
    }

    fn list_entities(&self) -> Result<Vec<EntityId>> {
        self.record(StoreCall::ListEntities);
        self.inner.list_entities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{Permission, UserId};
    use warden_store::MemoryStore;

    fn read() -> PermissionSet {
        [Permission::Read].into_iter().collect()
    }

    #[test]
    fn test_records_calls_in_order() {
        let store = RecordingStore::new(MemoryStore::new());

        let mut collection = PermissionCollection::new(read());
        store.save_collection(&mut collection).unwrap();
        let mut entity = SecuredEntity::new("roads");
        entity.user_permissions.attach(UserId(1), collection);
        let id = store.save_entity(&mut entity).unwrap();
        store.find_entity(id).unwrap();

        assert_eq!(
            store.calls(),
            vec![
                StoreCall::SaveCollection {
                    id: None,
                    permissions: read()
                },
                StoreCall::SaveEntity { id: None },
                StoreCall::FindEntity(id),
            ]
        );
        assert_eq!(store.saves(), (1, 1));
        assert_eq!(store.saves_in_order().len(), 2);

        store.clear();
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_injected_failure_is_recorded_and_returned() {
        let store = RecordingStore::new(MemoryStore::new());
        store.fail_collection_saves(true);

        let mut collection = PermissionCollection::new(read());
        let err = store.save_collection(&mut collection).unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!collection.is_persisted());
        assert_eq!(store.saves(), (1, 0));
        assert_eq!(store.inner().collection_count().unwrap(), 0);

        store.fail_collection_saves(false);
        assert!(store.save_collection(&mut collection).is_ok());
    }
}
