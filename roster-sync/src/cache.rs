//! Persisted fallback cache.
//!
//! A cache holds named slots of text. The synchronizer uses a single slot
//! for the last rendered snapshot and reads it back only when the remote
//! load fails.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tracing::{debug, info};

/// Abstract fallback cache.
#[async_trait]
pub trait FallbackCache: Send + Sync {
    /// Reads a slot. `Ok(None)` when the slot has never been written.
    async fn load(&self, slot: &str) -> SyncResult<Option<String>>;

    /// Overwrites a slot.
    async fn store(&self, slot: &str, text: &str) -> SyncResult<()>;
}

/// Cache backed by one JSON file per slot in a directory.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Creates a cache rooted at `dir`. The directory is created on first
    /// write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `slot`.
    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }
}

#[async_trait]
impl FallbackCache for FileCache {
    async fn load(&self, slot: &str) -> SyncResult<Option<String>> {
        let path = self.slot_path(slot);
        match fs::read_to_string(&path).await {
            Ok(text) => {
                debug!("Read cache slot {:?} ({} bytes)", path, text.len());
                Ok(Some(text))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::Cache(format!("failed to read {path:?}: {e}"))),
        }
    }

    async fn store(&self, slot: &str, text: &str) -> SyncResult<()> {
        if !fs::try_exists(&self.dir).await.unwrap_or(false) {
            fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| SyncError::Cache(format!("failed to create cache dir: {e}")))?;
            info!("Created cache directory: {:?}", self.dir);
        }

        let path = self.slot_path(slot);
        fs::write(&path, text)
            .await
            .map_err(|e| SyncError::Cache(format!("failed to write {path:?}: {e}")))?;
        Ok(())
    }
}

/// In-process cache, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with one slot already written.
    pub fn with_slot(slot: &str, text: impl Into<String>) -> Self {
        let cache = Self::new();
        cache.set(slot, text);
        cache
    }

    /// Writes a slot synchronously.
    pub fn set(&self, slot: &str, text: impl Into<String>) {
        self.lock().insert(slot.to_string(), text.into());
    }

    /// Reads a slot synchronously.
    pub fn get(&self, slot: &str) -> Option<String> {
        self.lock().get(slot).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map of strings.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl FallbackCache for MemoryCache {
    async fn load(&self, slot: &str) -> SyncResult<Option<String>> {
        Ok(self.get(slot))
    }

    async fn store(&self, slot: &str, text: &str) -> SyncResult<()> {
        self.set(slot, text);
        Ok(())
    }
}
