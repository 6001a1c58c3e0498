//! Configuration for Warden.

use serde::{Deserialize, Serialize};
use warden_store::StoreConfig;

use crate::error::Result;

/// Top-level configuration.
///
/// Every field has a default, so `{}` is a valid configuration for an
/// in-memory SQLite database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub store: StoreConfig,
}

impl WardenConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
