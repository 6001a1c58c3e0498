//! Strong type definitions for Warden.
//!
//! All identifiers are newtypes to prevent mixing a user id with a group id
//! (or an entity id with a collection id) at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Create an identifier from its raw value.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Get the raw value.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, ":{}"), self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix(concat!($label, ":")).unwrap_or(s);
                digits
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| CoreError::InvalidId(s.to_string()))
            }
        }
    };
}

define_id!(
    /// Identifier of a user principal.
    UserId,
    "user"
);

define_id!(
    /// Identifier of a user-group principal.
    GroupId,
    "group"
);

define_id!(
    /// Durable identity of a secured entity, assigned by the entity store.
    EntityId,
    "entity"
);

define_id!(
    /// Durable identity of a permission collection, assigned on first save.
    CollectionId,
    "collection"
);

/// Which kind of principal a mapping is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Group => "group",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user or user group that can hold permissions on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Principal {
    User(UserId),
    Group(GroupId),
}

impl Principal {
    pub const fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::Group(_) => PrincipalKind::Group,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(id) => write!(f, "{}", id),
            Principal::Group(id) => write!(f, "{}", id),
        }
    }
}

impl From<UserId> for Principal {
    fn from(id: UserId) -> Self {
        Principal::User(id)
    }
}

impl From<GroupId> for Principal {
    fn from(id: GroupId) -> Self {
        Principal::Group(id)
    }
}
