//! # Warden Store
//!
//! Storage abstraction for Warden. Permission collections and secured
//! entities are persisted through two narrow traits so the reconciler never
//! depends on a concrete backend.
//!
//! ## Key Types
//!
//! - [`PermissionCollectionStore`] - save-or-update of permission collections
//! - [`EntityStore`] - save-or-update, lookup and deletion of secured entities
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`StoreConfig`] - Where the SQLite database lives
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_core::{Permission, PermissionCollection, SecuredEntity, UserId};
//! use warden_store::{EntityStore, PermissionCollectionStore, SqliteStore};
//!
//! let store = SqliteStore::open_memory().unwrap();
//!
//! let mut entity = SecuredEntity::new("basemap");
//! let mut collection = PermissionCollection::new([Permission::Read].into_iter().collect());
//! store.save_collection(&mut collection).unwrap();
//!
//! entity.user_permissions.attach(UserId(1), collection);
//! store.save_entity(&mut entity).unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **Identity on first save**: unsaved values get their id from the store
//! - **Upsert semantics**: saving a value that already has an id overwrites it
//! - **Transient check**: an entity cannot be saved while one of its attached
//!   collections has never been saved
//! - **Exclusive collections**: a collection id belongs to exactly one
//!   principal of one entity

pub mod config;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    attached_collection_ids, entity_collection_ids, CollectionIds, EntityStore,
    PermissionCollectionStore,
};
