//! # Warden Core
//!
//! Pure data model for Warden: principals, permissions, permission
//! collections and the secured entities that own them.
//!
//! This crate contains no I/O and no storage. It is the vocabulary shared by
//! the store backends and the permission reconciler.
//!
//! ## Key Types
//!
//! - [`Permission`] - An enumerated access right (`READ`, `WRITE`, ...)
//! - [`PermissionCollection`] - A persisted, mutable set of permissions
//! - [`PermissionMap`] - Principal-keyed collections owned by one entity
//! - [`SecuredEntity`] - An entity carrying user and group permissions
//! - [`Scope`] - Selects the user-keyed or group-keyed mapping
//! - [`SetDelta`] - Size change of a permission set mutated in place
//!
//! ## Ownership
//!
//! A [`SecuredEntity`] owns its two [`PermissionMap`]s, and each map owns its
//! collections. A collection can therefore never be attached to two
//! principals at once.

pub mod collection;
pub mod delta;
pub mod entity;
pub mod error;
pub mod patch;
pub mod permission;
pub mod scope;
pub mod types;

pub use collection::{PermissionCollection, PermissionMap};
pub use delta::SetDelta;
pub use entity::SecuredEntity;
pub use error::{CoreError, Result};
pub use patch::EntityPatch;
pub use permission::{Permission, PermissionSet};
pub use scope::{GroupScope, Scope, UserScope};
pub use types::{CollectionId, EntityId, GroupId, Principal, PrincipalKind, UserId};
