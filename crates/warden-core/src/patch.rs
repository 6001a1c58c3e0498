//! Partial updates of secured entities.
//!
//! A patch only carries the fields a caller wants to change. Absent fields
//! leave the target untouched, so applying a patch built from a sparse
//! request never blanks out existing data.

use serde::{Deserialize, Serialize};

use crate::entity::SecuredEntity;

/// Null-aware update of the scalar fields of a [`SecuredEntity`].
///
/// Permission mappings are deliberately not patchable; they only change
/// through reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntityPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    /// Copy every present field onto `entity`.
    ///
    /// Returns `true` if at least one field changed value.
    pub fn apply_to(&self, entity: &mut SecuredEntity) -> bool {
        let mut changed = false;

        if let Some(name) = &self.name {
            if &entity.name != name {
                entity.name = name.clone();
                changed = true;
            }
        }

        if let Some(description) = &self.description {
            if entity.description.as_ref() != Some(description) {
                entity.description = Some(description.clone());
                changed = true;
            }
        }

        changed
    }
}
