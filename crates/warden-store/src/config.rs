//! Store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the SQLite backend keeps its data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. `None` opens an in-memory database.
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}
