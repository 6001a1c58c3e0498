//! The secured-object service: unified API for Warden.
//!
//! The service owns one backend and a reconciler on top of it, and exposes
//! entity CRUD next to the four permission operations.

use std::sync::Arc;

use warden_core::{
    EntityId, EntityPatch, GroupId, Permission, PermissionSet, Principal, SecuredEntity, UserId,
};
use warden_perms::{Outcome, PermissionReconciler};
use warden_store::{EntityStore, PermissionCollectionStore, SqliteStore};

use crate::config::WardenConfig;
use crate::error::{Result, WardenError};

/// CRUD and permission management for secured entities.
///
/// Provides:
/// - Creating, loading, patching and deleting entities
/// - Adding and removing user permissions
/// - Adding and removing group permissions
pub struct SecuredObjectService<S> {
    /// The storage backend.
    store: Arc<S>,
    /// Reconciler sharing the same backend for both stores.
    reconciler: PermissionReconciler<Arc<S>, Arc<S>>,
}

impl SecuredObjectService<SqliteStore> {
    /// Open the SQLite database described by `config`.
    pub fn open(config: &WardenConfig) -> Result<Self> {
        let store = SqliteStore::from_config(&config.store)?;
        Ok(Self::new(store))
    }
}

impl<S> SecuredObjectService<S>
where
    S: PermissionCollectionStore + EntityStore,
{
    /// Create a service over `store`.
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        let reconciler = PermissionReconciler::new(store.clone(), store.clone());
        Self { store, reconciler }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reconciler(&self) -> &PermissionReconciler<Arc<S>, Arc<S>> {
        &self.reconciler
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entity Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create and save a new entity with no permissions.
    pub fn create_entity(&self, name: &str, description: Option<&str>) -> Result<SecuredEntity> {
        let mut entity = SecuredEntity::new(name);
        entity.description = description.map(str::to_owned);

        let id = self.store.save_entity(&mut entity)?;
        tracing::debug!(entity = %id, name, "created entity");
        Ok(entity)
    }

    pub fn find_entity(&self, id: EntityId) -> Result<Option<SecuredEntity>> {
        Ok(self.store.find_entity(id)?)
    }

    /// Like [`find_entity`](Self::find_entity), but a missing entity is an error.
    pub fn get_entity(&self, id: EntityId) -> Result<SecuredEntity> {
        self.find_entity(id)?.ok_or(WardenError::EntityNotFound(id))
    }

    pub fn list_entities(&self) -> Result<Vec<EntityId>> {
        Ok(self.store.list_entities()?)
    }

    /// Apply `patch` to the stored entity.
    ///
    /// Fields absent from the patch keep their stored value. The entity is
    /// only saved when a field actually changed.
    pub fn update_entity(&self, id: EntityId, patch: &EntityPatch) -> Result<SecuredEntity> {
        let mut entity = self.get_entity(id)?;

        if patch.apply_to(&mut entity) {
            self.store.save_entity(&mut entity)?;
            tracing::debug!(entity = %id, "updated entity");
        } else {
            tracing::debug!(entity = %id, "patch changed nothing");
        }

        Ok(entity)
    }

    /// Delete an entity together with its permission collections.
    ///
    /// Returns `false` if it did not exist.
    pub fn delete_entity(&self, id: EntityId) -> Result<bool> {
        let deleted = self.store.delete_entity(id)?;
        if deleted {
            tracing::debug!(entity = %id, "deleted entity");
        }
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Add `permissions` for `user` on `entity` and save what changed.
    pub fn add_and_save_user_permissions(
        &self,
        entity: Option<&mut SecuredEntity>,
        user: &UserId,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        Ok(self.reconciler.grant_user(entity, user, permissions)?)
    }

    /// Remove `permissions` for `user` on `entity` and save what changed.
    pub fn remove_and_save_user_permissions(
        &self,
        entity: Option<&mut SecuredEntity>,
        user: &UserId,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        Ok(self.reconciler.revoke_user(entity, user, permissions)?)
    }

    /// Add `permissions` for `group` on `entity` and save what changed.
    pub fn add_and_save_group_permissions(
        &self,
        entity: Option<&mut SecuredEntity>,
        group: &GroupId,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        Ok(self.reconciler.grant_group(entity, group, permissions)?)
    }

    /// Remove `permissions` for `group` on `entity` and save what changed.
    pub fn remove_and_save_group_permissions(
        &self,
        entity: Option<&mut SecuredEntity>,
        group: &GroupId,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        Ok(self.reconciler.revoke_group(entity, group, permissions)?)
    }

    /// Stored permissions of `principal` on entity `id`.
    ///
    /// `None` if the principal has no collection on the entity.
    pub fn permissions_of(&self, id: EntityId, principal: Principal) -> Result<Option<PermissionSet>> {
        let entity = self.get_entity(id)?;
        Ok(entity
            .permissions_of(principal)
            .map(|collection| collection.permissions().clone()))
    }
}

/// Parse permission names such as `"READ"` or `"write"` into a set.
pub fn parse_permissions<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<PermissionSet> {
    names
        .into_iter()
        .map(|name| name.parse::<Permission>().map_err(WardenError::from))
        .collect()
}
