//! Client configuration.
//!
//! Loaded from an optional JSON file, then overridden field by field from
//! the command line and environment.

use anyhow::{Context, Result};
use roster_sync::{RestConfig, SyncConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Hosted backend connection.
    pub rest: RestConfig,
    /// Table, cache slot and reconciliation policies.
    pub sync: SyncConfig,
    /// Directory holding the fallback cache.
    pub cache_dir: PathBuf,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            rest: RestConfig::default(),
            sync: SyncConfig::default(),
            cache_dir: PathBuf::from(".roster-cache"),
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub key: Option<String>,
    pub table: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

impl RosterConfig {
    /// Reads the config file at `path`, or returns the defaults when no
    /// path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Replaces every field that has an override.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.url {
            self.rest.base_url = url;
        }
        if let Some(key) = overrides.key {
            self.rest.api_key = key;
        }
        if let Some(table) = overrides.table {
            self.sync.table = table;
        }
        if let Some(dir) = overrides.cache_dir {
            self.cache_dir = dir;
        }
    }
}
