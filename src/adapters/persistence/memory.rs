//! In-Memory Tree Store
//!
//! Backs tests and local development. The whole tree lives behind a
//! single `RwLock`, so every write is atomic with respect to readers.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::tree;
use crate::ports::store::TreeStore;

/// JSON tree held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RwLock<Value>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `root`.
    pub fn with_tree(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    /// Copy of the whole tree.
    pub async fn dump(&self) -> Value {
        self.root.read().await.clone()
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        let segments = tree::segments(path)?;
        let root = self.root.read().await;
        Ok(tree::lookup(&root, &segments).cloned())
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let segments = tree::segments(path)?;
        let mut root = self.root.write().await;
        tree::assign(&mut root, &segments, value);
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
