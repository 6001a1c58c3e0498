//! The permission reconciler.
//!
//! Both paths are written once against [`Scope`]: the grant path attaches or
//! extends a collection, the revoke path reduces an existing one. A call
//! issues at most one collection save and one entity save, in that order,
//! and none at all when the collection did not change.
//!
//! An attach is complete once both saves succeeded. A collection left
//! unsaved by a failed attach is saved again, followed by the entity, by the
//! next call that reaches it.

use std::collections::btree_map::Entry;

use warden_core::{
    GroupId, GroupScope, Permission, PermissionCollection, PermissionSet, Principal, Scope,
    SecuredEntity, UserId, UserScope,
};
use warden_store::{EntityStore, PermissionCollectionStore};

use crate::error::{Rejection, Result};

/// What a reconciliation call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new collection was attached, then it and the entity were saved.
    Attached,
    /// An existing collection gained permissions and was saved.
    Extended,
    /// An existing collection lost permissions and was saved.
    Reduced,
    /// Nothing changed and nothing was saved.
    Unchanged,
}

impl Outcome {
    /// Number of collection saves the call issued.
    pub fn collection_saves(&self) -> usize {
        match self {
            Outcome::Attached | Outcome::Extended | Outcome::Reduced => 1,
            Outcome::Unchanged => 0,
        }
    }

    /// Number of entity saves the call issued.
    pub fn entity_saves(&self) -> usize {
        match self {
            Outcome::Attached => 1,
            _ => 0,
        }
    }

    /// Whether the call saved anything.
    pub fn is_changed(&self) -> bool {
        !matches!(self, Outcome::Unchanged)
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Grant,
    Revoke,
}

impl Operation {
    fn verb(self) -> &'static str {
        match self {
            Operation::Grant => "add",
            Operation::Revoke => "remove",
        }
    }
}

/// Merges permission changes into the collections of a [`SecuredEntity`].
///
/// The reconciler holds no state of its own besides the two stores. It takes
/// the entity by `&mut`, so a single process cannot reconcile the same
/// entity twice at once. Reconciling the same (entity, principal) pair from
/// several processes needs a transaction or row lock held by the caller
/// around the call.
pub struct PermissionReconciler<C, E> {
    collections: C,
    entities: E,
}

impl<C, E> PermissionReconciler<C, E>
where
    C: PermissionCollectionStore,
    E: EntityStore,
{
    pub fn new(collections: C, entities: E) -> Self {
        Self {
            collections,
            entities,
        }
    }

    /// The store collections are saved to.
    pub fn collection_store(&self) -> &C {
        &self.collections
    }

    /// The store the entity is saved to after an attach.
    pub fn entity_store(&self) -> &E {
        &self.entities
    }

    /// Grant `permissions` to `principal` on `entity`.
    ///
    /// Attaches a new collection holding exactly `permissions` if the
    /// principal has none, saving the collection and then the entity.
    /// Otherwise unions into the existing collection and saves it only if
    /// it grew. An existing collection that was never saved, left behind by
    /// a failed attach, is saved whether or not it grew, and the entity
    /// after it.
    ///
    /// A missing entity or an empty permission set is logged and ignored.
    ///
    /// # Errors
    /// Store failures propagate as-is. Changes already made in memory are
    /// kept.
    pub fn grant<S: Scope>(
        &self,
        entity: Option<&mut SecuredEntity>,
        principal: &S::Principal,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        let principal = *principal;
        let who: Principal = principal.into();
        let Some(entity) = entity else {
            return Ok(reject::<S>(Operation::Grant, who, Rejection::MissingEntity));
        };
        let permissions: PermissionSet = permissions.into_iter().collect();
        if permissions.is_empty() {
            return Ok(reject::<S>(Operation::Grant, who, Rejection::EmptyPermissionSet));
        }

        let attached = match S::permissions_mut(entity).entry(principal) {
            Entry::Vacant(slot) => {
                let collection = slot.insert(PermissionCollection::new(permissions));
                tracing::debug!(
                    principal = %who,
                    permissions = ?collection.permissions(),
                    "attached a new permission collection"
                );
                self.save(collection)?;
                true
            }
            Entry::Occupied(slot) => {
                let collection = slot.into_mut();
                let grew = collection.grant(&permissions).grew();
                if !collection.is_persisted() {
                    tracing::debug!(
                        principal = %who,
                        permissions = ?collection.permissions(),
                        "finishing the attach of an unsaved permission collection"
                    );
                    self.save(collection)?;
                    true
                } else if grew {
                    tracing::debug!(
                        principal = %who,
                        added = ?permissions,
                        "added permissions to an existing permission collection"
                    );
                    self.save(collection)?;
                    false
                } else {
                    tracing::debug!(
                        principal = %who,
                        "all permissions already held, nothing to persist"
                    );
                    return Ok(Outcome::Unchanged);
                }
            }
        };

        if !attached {
            return Ok(Outcome::Extended);
        }
        self.save_attached(entity)
    }

    /// Revoke `permissions` from `principal` on `entity`.
    ///
    /// Only an existing collection is touched, and it is saved only if it
    /// shrank. The entity itself is not saved, unless the collection was
    /// never saved: then the interrupted attach is finished as in
    /// [`grant`](Self::grant). A collection revoked down to nothing stays
    /// attached.
    ///
    /// # Errors
    /// Store failures propagate as-is.
    pub fn revoke<S: Scope>(
        &self,
        entity: Option<&mut SecuredEntity>,
        principal: &S::Principal,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        let principal = *principal;
        let who: Principal = principal.into();
        let Some(entity) = entity else {
            return Ok(reject::<S>(Operation::Revoke, who, Rejection::MissingEntity));
        };
        let permissions: PermissionSet = permissions.into_iter().collect();
        if permissions.is_empty() {
            return Ok(reject::<S>(Operation::Revoke, who, Rejection::EmptyPermissionSet));
        }

        let Some(collection) = S::permissions_mut(entity).get_mut(&principal) else {
            return Ok(reject::<S>(Operation::Revoke, who, Rejection::NoExistingCollection));
        };

        let shrank = collection.revoke(&permissions).shrank();
        if !collection.is_persisted() {
            tracing::debug!(
                principal = %who,
                permissions = ?collection.permissions(),
                "finishing the attach of an unsaved permission collection"
            );
            self.save(collection)?;
            return self.save_attached(entity);
        }

        if !shrank {
            tracing::debug!(
                principal = %who,
                "none of the permissions were held, nothing to persist"
            );
            return Ok(Outcome::Unchanged);
        }

        tracing::debug!(
            principal = %who,
            removed = ?permissions,
            remaining = collection.len(),
            "removed permissions from an existing permission collection"
        );
        self.save(collection)?;
        Ok(Outcome::Reduced)
    }

    pub fn grant_user(
        &self,
        entity: Option<&mut SecuredEntity>,
        user: &UserId,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        self.grant::<UserScope>(entity, user, permissions)
    }

    pub fn grant_group(
        &self,
        entity: Option<&mut SecuredEntity>,
        group: &GroupId,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        self.grant::<GroupScope>(entity, group, permissions)
    }

    pub fn revoke_user(
        &self,
        entity: Option<&mut SecuredEntity>,
        user: &UserId,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        self.revoke::<UserScope>(entity, user, permissions)
    }

    pub fn revoke_group(
        &self,
        entity: Option<&mut SecuredEntity>,
        group: &GroupId,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Outcome> {
        self.revoke::<GroupScope>(entity, group, permissions)
    }

    fn save_attached(&self, entity: &mut SecuredEntity) -> Result<Outcome> {
        let id = self.entities.save_entity(entity)?;
        tracing::debug!(entity = %id, "persisted the entity with a new permission collection");
        Ok(Outcome::Attached)
    }

    fn save(&self, collection: &mut PermissionCollection) -> Result<()> {
        let id = self.collections.save_collection(collection)?;
        tracing::debug!(collection = %id, "persisted a permission collection");
        Ok(())
    }
}

fn reject<S: Scope>(operation: Operation, principal: Principal, rejection: Rejection) -> Outcome {
    tracing::error!(
        scope = S::KIND.as_str(),
        %principal,
        "could not {} permissions: {}",
        operation.verb(),
        rejection
    );
    Outcome::Unchanged
}
