//! Tree Store Port - Hierarchical Key/Value Persistence
//!
//! The bot only needs two operations from its backing store: read the
//! JSON subtree at a slash-separated path, and replace the subtree at a
//! path. Firebase Realtime Database, a JSON file and an in-memory tree
//! all fit this shape.

use async_trait::async_trait;
use serde_json::Value;

/// Hierarchical JSON store addressed by `a/b/c` paths.
///
/// Writes to disjoint paths must not interfere with each other, so
/// ingest cycles for different base currencies never touch each
/// other's subtrees.
#[async_trait]
pub trait TreeStore: Send + Sync + 'static {
  /// Read the subtree at `path`. `None` when nothing is stored there.
  async fn read(&self, path: &str) -> anyhow::Result<Option<Value>>;

  /// Replace the subtree at `path` with `value`.
  async fn write(&self, path: &str, value: Value) -> anyhow::Result<()>;

  /// Check if the store is reachable.
  async fn is_healthy(&self) -> bool;
}
