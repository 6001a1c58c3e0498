//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use tracing_subscriber::filter::LevelFilter;
use warden_core::SecuredEntity;
use warden_perms::PermissionReconciler;
use warden_store::{EntityStore, MemoryStore, PermissionCollectionStore, SqliteStore};

use crate::recording::RecordingStore;

/// Store handle shared by a fixture and its reconciler.
pub type SharedStore<S> = Arc<RecordingStore<S>>;

/// A test fixture with a recording store and a reconciler on top of it.
pub struct TestFixture<S = MemoryStore> {
    pub store: SharedStore<S>,
    pub reconciler: PermissionReconciler<SharedStore<S>, SharedStore<S>>,
}

impl TestFixture<MemoryStore> {
    /// Create a fixture backed by a fresh [`MemoryStore`].
    pub fn new() -> Self {
        Self::with_backend(MemoryStore::new())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture<SqliteStore> {
    /// Create a fixture backed by an in-memory SQLite database.
    pub fn sqlite() -> warden_store::Result<Self> {
        Ok(Self::with_backend(SqliteStore::open_memory()?))
    }
}

impl<S> TestFixture<S>
where
    S: PermissionCollectionStore + EntityStore,
{
    pub fn with_backend(backend: S) -> Self {
        let store = Arc::new(RecordingStore::new(backend));
        let reconciler = PermissionReconciler::new(store.clone(), store.clone());
        Self { store, reconciler }
    }

    /// A fresh, unsaved entity.
    pub fn entity(&self, name: &str) -> SecuredEntity {
        SecuredEntity::new(name)
    }

    /// An entity already saved to the backend. The save is not recorded.
    pub fn persisted_entity(&self, name: &str) -> warden_store::Result<SecuredEntity> {
        let mut entity = SecuredEntity::new(name);
        self.store.inner().save_entity(&mut entity)?;
        Ok(entity)
    }

    /// Load the stored state of `entity` from the backend, bypassing the
    /// journal.
    pub fn reload(&self, entity: &SecuredEntity) -> warden_store::Result<Option<SecuredEntity>> {
        match entity.id() {
            Some(id) => self.store.inner().find_entity(id),
            None => Ok(None),
        }
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}
