//! Accessors that select which permission mapping of an entity to work on.
//!
//! Code that merges or detaches permissions is written once against
//! [`Scope`] and instantiated for [`UserScope`] and [`GroupScope`].

use std::fmt;

use crate::collection::PermissionMap;
use crate::entity::SecuredEntity;
use crate::types::{GroupId, Principal, PrincipalKind, UserId};

/// Accessor pair for one principal-keyed mapping of a [`SecuredEntity`].
pub trait Scope {
    /// Key type of the mapping.
    type Principal: Ord + Copy + fmt::Debug + Into<Principal>;

    /// Which kind of principal keys the mapping, used in log fields.
    const KIND: PrincipalKind;

    fn permissions(entity: &SecuredEntity) -> &PermissionMap<Self::Principal>;

    fn permissions_mut(entity: &mut SecuredEntity) -> &mut PermissionMap<Self::Principal>;
}

/// The user-keyed mapping.
#[derive(Debug)]
pub enum UserScope {}

/// The group-keyed mapping.
#[derive(Debug)]
pub enum GroupScope {}

impl Scope for UserScope {
    type Principal = UserId;

    const KIND: PrincipalKind = PrincipalKind::User;

    fn permissions(entity: &SecuredEntity) -> &PermissionMap<UserId> {
        &entity.user_permissions
    }

    fn permissions_mut(entity: &mut SecuredEntity) -> &mut PermissionMap<UserId> {
        &mut entity.user_permissions
    }
}

impl Scope for GroupScope {
    type Principal = GroupId;

    const KIND: PrincipalKind = PrincipalKind::Group;

    fn permissions(entity: &SecuredEntity) -> &PermissionMap<GroupId> {
        &entity.group_permissions
    }

    fn permissions_mut(entity: &mut SecuredEntity) -> &mut PermissionMap<GroupId> {
        &mut entity.group_permissions
    }
}
