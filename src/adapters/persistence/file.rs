//! File Tree Store - Atomic JSON Document on Disk
//!
//! Keeps the whole rate tree in `store.json` using atomic writes
//! (write to tmp file, then rename). The file is always either the
//! old or the new version, never a partial write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::tree;
use crate::ports::store::TreeStore;

/// Single-document JSON tree store.
///
/// Writes are serialized through a mutex and re-read the file first,
/// so a write to one path never drops a concurrent write to another.
pub struct FileStore {
    /// Path to store.json.
    store_path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a new file store in the given data directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;

        info!(path = %dir.display(), "File store opened");

        Ok(Self {
            store_path: dir.join("store.json"),
            tmp_path: dir.join("store.json.tmp"),
            write_lock: Mutex::new(()),
        })
    }

    /// Load the whole tree; a missing file is an empty tree.
    async fn load(&self) -> Result<Value> {
        let exists = fs::try_exists(&self.store_path)
            .await
            .context("Failed to stat store file")?;
        if !exists {
            return Ok(Value::Null);
        }
        let json = fs::read_to_string(&self.store_path)
            .await
            .context("Failed to read store file")?;
        serde_json::from_str(&json).context("Failed to parse store JSON")
    }
}

#[async_trait]
impl TreeStore for FileStore {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        let segments = tree::segments(path)?;
        let root = self.load().await?;
        Ok(tree::lookup(&root, &segments).cloned())
    }

    #[instrument(skip(self, value))]
    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let segments = tree::segments(path)?;
        let _guard = self.write_lock.lock().await;

        let mut root = self.load().await?;
        tree::assign(&mut root, &segments, value);

        let json = serde_json::to_string_pretty(&root)
            .context("Failed to serialize store")?;

        // Write to tmp file
        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp store file")?;

        // Atomic rename
        fs::rename(&self.tmp_path, &self.store_path)
            .await
            .context("Failed to rename store file")?;

        debug!(path = %self.store_path.display(), "Store file written");
        Ok(())
    }

    /// Check if the store file can be inspected (a missing file is fine).
    async fn is_healthy(&self) -> bool {
        fs::try_exists(&self.store_path).await.is_ok()
    }
}
