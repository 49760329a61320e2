//! Persistent byte store abstraction
//!
//! Each pipeline component persists its state under its own key; there is
//! no shared schema and no transaction spanning keys. A storage outage
//! degrades persistence, never the current operation, so callers log and
//! swallow store errors.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;

use crate::{Result, VrtError};

/// Namespaced byte store with load/save semantics
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// In-memory store, useful for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .cloned())
    }

    async fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// File-backed store, one `{key}.json` file per key under a base directory
pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)
            .await
            .map_err(|e| VrtError::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
        debug!("Loaded {} bytes from {}", bytes.len(), path.display());
        Ok(Some(bytes))
    }

    async fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            VrtError::Storage(format!(
                "Failed to create store directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        let path = self.path_for(key);
        fs::write(&path, bytes)
            .await
            .map_err(|e| VrtError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;
        debug!("Stored {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// Store key for snapshot records
pub const SNAPSHOT_STORE_KEY: &str = "vrt_snapshots";
/// Store key for diff results
pub const DIFF_STORE_KEY: &str = "vrt_diffs";
/// Store key for confidence adjustments and the learning model
pub const CONFIDENCE_STORE_KEY: &str = "vrt_confidence";
/// Store key for test suites
pub const SUITE_STORE_KEY: &str = "vrt_test_suites";
