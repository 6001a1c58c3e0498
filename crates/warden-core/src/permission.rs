//! Access rights.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// An access right on a secured entity.
///
/// Permissions carry no payload and compare by value. Their order is only
/// used to keep [`PermissionSet`] iteration deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Create,
    Read,
    Write,
    Delete,
    Admin,
}

/// A deduplicated set of permissions.
pub type PermissionSet = BTreeSet<Permission>;

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Permission; 5] = [
        Permission::Create,
        Permission::Read,
        Permission::Write,
        Permission::Delete,
        Permission::Admin,
    ];

    /// The wire name, e.g. `"READ"`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::Create => "CREATE",
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::Delete => "DELETE",
            Permission::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| CoreError::UnknownPermission(s.to_string()))
    }
}
