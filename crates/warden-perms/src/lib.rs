//! # Warden Permissions
//!
//! Grant and revoke of principal permissions on secured entities.
//!
//! ## Overview
//!
//! A [`SecuredEntity`](warden_core::SecuredEntity) owns one
//! [`PermissionCollection`](warden_core::PermissionCollection) per user and
//! per group. The [`PermissionReconciler`] merges incoming permissions into
//! those collections (attaching a new one when a principal has none yet),
//! removes outgoing ones, and writes to the store only when a collection
//! actually changed.
//!
//! ## Key Concepts
//!
//! - **Grant**: union of the incoming set into the principal's collection
//! - **Revoke**: difference of the outgoing set from an existing collection
//! - **Outcome**: what a call did, including how many saves it issued
//! - **Rejection**: invalid input, logged and turned into a no-op
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use warden_core::{Permission, SecuredEntity, UserId};
//! use warden_perms::PermissionReconciler;
//! use warden_store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let reconciler = PermissionReconciler::new(store.clone(), store);
//!
//! let mut entity = SecuredEntity::new("basemap");
//! reconciler
//!     .grant_user(Some(&mut entity), &UserId(7), [Permission::Read, Permission::Write])
//!     .unwrap();
//! reconciler
//!     .revoke_user(Some(&mut entity), &UserId(7), [Permission::Write])
//!     .unwrap();
//! ```

pub mod error;
pub mod reconciler;

pub use error::{Rejection, Result};
pub use reconciler::{Outcome, PermissionReconciler};
