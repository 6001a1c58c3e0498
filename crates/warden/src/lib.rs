//! # Warden
//!
//! Secured entities with per-user and per-group permission collections.
//!
//! ## Overview
//!
//! Warden keeps, for every secured entity, one permission collection per
//! user and one per group. Permissions are granted and revoked through a
//! reconciler that merges the change into the right collection and only
//! writes to the store when the collection actually changed.
//!
//! - **Entities**: Named objects that carry permission mappings
//! - **Collections**: The set of permissions one principal holds on one entity
//! - **Reconciliation**: Grant (union) and revoke (difference) with
//!   change-gated persistence
//! - **Stores**: In-memory for tests, SQLite for everything else
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden::{SecuredObjectService, WardenConfig};
//! use warden::core::{Permission, UserId};
//!
//! let config = WardenConfig::from_json(r#"{ "store": { "path": "warden.db" } }"#).unwrap();
//! let service = SecuredObjectService::open(&config).unwrap();
//!
//! let mut entity = service.create_entity("basemap", None).unwrap();
//! service
//!     .add_and_save_user_permissions(Some(&mut entity), &UserId(7), [Permission::Read])
//!     .unwrap();
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `warden::core` - Data model (entities, collections, permissions, ids)
//! - `warden::store` - Store traits, memory and SQLite backends
//! - `warden::perms` - The permission reconciler

pub mod config;
pub mod error;
pub mod service;

// Re-export component crates
pub use warden_core as core;
pub use warden_perms as perms;
pub use warden_store as store;

// Re-export main types for convenience
pub use config::WardenConfig;
pub use error::{Result, WardenError};
pub use service::{parse_permissions, SecuredObjectService};

// Re-export commonly used types
pub use warden_core::{
    EntityId, EntityPatch, GroupId, Permission, PermissionCollection, PermissionSet, Principal,
    SecuredEntity, UserId,
};
pub use warden_perms::{Outcome, PermissionReconciler};
pub use warden_store::{MemoryStore, SqliteStore, StoreConfig};
