//! Synchronizer configuration.

use serde::{Deserialize, Serialize};

/// How an `UPDATE` for an id that is not in the local store is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Drop the update. An update delivered ahead of its insert is lost.
    #[default]
    DropUnmatched,
    /// Replace when present, append otherwise. Updates are never lost.
    Upsert,
}

/// How the store is ordered after incremental changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPolicy {
    /// Loaded records keep the remote `created_at` order; streamed inserts
    /// go to the end regardless of their timestamp.
    #[default]
    Append,
    /// Re-sort by `created_at` after every mutation.
    CreatedAt,
}

/// Configuration for the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote collection (table) holding the records.
    pub table: String,
    /// Name of the fallback cache slot.
    pub cache_slot: String,
    pub update_policy: UpdatePolicy,
    pub order_policy: OrderPolicy,
    /// First delay before resubscribing to a dropped change feed.
    pub resubscribe_base_ms: u64,
    /// Upper bound on the doubling resubscribe delay.
    pub resubscribe_max_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            table: "employees".to_string(),
            cache_slot: "employeeData".to_string(),
            update_policy: UpdatePolicy::default(),
            order_policy: OrderPolicy::default(),
            resubscribe_base_ms: 500,
            resubscribe_max_ms: 30_000,
        }
    }
}
