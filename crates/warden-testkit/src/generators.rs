//! Proptest generators for property-based testing.

use proptest::prelude::*;

use warden_core::{GroupId, Permission, PermissionSet, Principal, SecuredEntity, UserId};
use warden_perms::{Outcome, PermissionReconciler};
use warden_store::{EntityStore, PermissionCollectionStore};

/// Generate a single permission.
pub fn permission() -> impl Strategy<Value = Permission> {
    prop::sample::select(Permission::ALL.to_vec())
}

/// Generate a permission set, possibly empty.
pub fn permission_set() -> impl Strategy<Value = PermissionSet> {
    prop::sample::subsequence(Permission::ALL.to_vec(), 0..=Permission::ALL.len())
        .prop_map(|permissions| permissions.into_iter().collect())
}

/// Generate a permission set with at least one member.
pub fn non_empty_permission_set() -> impl Strategy<Value = PermissionSet> {
    prop::sample::subsequence(Permission::ALL.to_vec(), 1..=Permission::ALL.len())
        .prop_map(|permissions| permissions.into_iter().collect())
}

/// Generate a user id from a small pool so steps collide on principals.
pub fn user_id() -> impl Strategy<Value = UserId> {
    (1i64..=4).prop_map(UserId)
}

/// Generate a group id from a small pool.
pub fn group_id() -> impl Strategy<Value = GroupId> {
    (1i64..=4).prop_map(GroupId)
}

pub fn principal() -> impl Strategy<Value = Principal> {
    prop_oneof![
        user_id().prop_map(Principal::User),
        group_id().prop_map(Principal::Group),
    ]
}

/// Grant or revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Grant,
    Revoke,
}

/// One reconciliation call against an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileStep {
    pub action: Action,
    pub principal: Principal,
    pub permissions: PermissionSet,
}

impl ReconcileStep {
    pub fn grant(principal: impl Into<Principal>, permissions: &[Permission]) -> Self {
        Self {
            action: Action::Grant,
            principal: principal.into(),
            permissions: permissions.iter().copied().collect(),
        }
    }

    pub fn revoke(principal: impl Into<Principal>, permissions: &[Permission]) -> Self {
        Self {
            action: Action::Revoke,
            principal: principal.into(),
            permissions: permissions.iter().copied().collect(),
        }
    }

    /// Run this step through `reconciler`.
    pub fn apply<C, E>(
        &self,
        reconciler: &PermissionReconciler<C, E>,
        entity: &mut SecuredEntity,
    ) -> warden_store::Result<Outcome>
    where
        C: PermissionCollectionStore,
        E: EntityStore,
    {
        let permissions = self.permissions.iter().copied();
        match (self.action, self.principal) {
            (Action::Grant, Principal::User(user)) => {
                reconciler.grant_user(Some(entity), &user, permissions)
            }
            (Action::Grant, Principal::Group(group)) => {
                reconciler.grant_group(Some(entity), &group, permissions)
            }
            (Action::Revoke, Principal::User(user)) => {
                reconciler.revoke_user(Some(entity), &user, permissions)
            }
            (Action::Revoke, Principal::Group(group)) => {
                reconciler.revoke_group(Some(entity), &group, permissions)
            }
        }
    }
}

impl Arbitrary for ReconcileStep {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop_oneof![Just(Action::Grant), Just(Action::Revoke)],
            principal(),
            permission_set(),
        )
            .prop_map(|(action, principal, permissions)| ReconcileStep {
                action,
                principal,
                permissions,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::fixtures::TestFixture;

    proptest! {
        #[test]
        fn test_steps_match_set_model(steps in prop::collection::vec(any::<ReconcileStep>(), 0..24)) {
            let fixture = TestFixture::new();
            let mut entity = fixture.entity("prop");
            let mut model: BTreeMap<Principal, PermissionSet> = BTreeMap::new();

            for step in &steps {
                let outcome = step.apply(&fixture.reconciler, &mut entity).unwrap();

                let before = model.get(&step.principal).cloned();
                match step.action {
                    Action::Grant if !step.permissions.is_empty() => {
                        model
                            .entry(step.principal)
                            .or_default()
                            .extend(step.permissions.iter().copied());
                    }
                    Action::Revoke => {
                        if let Some(held) = model.get_mut(&step.principal) {
                            held.retain(|p| !step.permissions.contains(p));
                        }
                    }
                    Action::Grant => {}
                }
                prop_assert_eq!(outcome.is_changed(), model.get(&step.principal) != before.as_ref());
            }

            for (principal, expected) in &model {
                let held = entity.permissions_of(*principal).map(|c| c.permissions().clone());
                prop_assert_eq!(held.as_ref(), Some(expected));
            }
        }

        #[test]
        fn test_unchanged_steps_save_nothing(steps in prop::collection::vec(any::<ReconcileStep>(), 1..16)) {
            let fixture = TestFixture::new();
            let mut entity = fixture.entity("prop");

            for step in &steps {
                let before = fixture.store.saves();
                let outcome = step.apply(&fixture.reconciler, &mut entity).unwrap();
                let (collections, entities) = fixture.store.saves();

                prop_assert_eq!(collections - before.0, outcome.collection_saves());
                prop_assert_eq!(entities - before.1, outcome.entity_saves());
            }
        }
    }
}
