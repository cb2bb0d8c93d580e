//! Repository Port - Current Rates and History
//!
//! Typed view over the rate tree:
//! - `rates/{base}` holds the latest quote per currency (mutable)
//! - `history/{base}/{YYYYMMDDHHMM}` holds one snapshot per ingest cycle
//!   (append-only, never overwritten)

use async_trait::async_trait;

use crate::domain::rates::{CurrencyCode, Quotes, RateSnapshot};

/// Trait for rate persistence providers.
#[async_trait]
pub trait RateRepository: Send + Sync + 'static {
  /// Load `current[base]`, or `None` if nothing was ever stored.
  async fn current(&self, base: &CurrencyCode) -> anyhow::Result<Option<Quotes>>;

  /// Replace `current[base]` with the given (already merged) quotes.
  async fn save_current(&self, base: &CurrencyCode, quotes: &Quotes) -> anyhow::Result<()>;

  /// Whether a history entry already exists under `key`.
  async fn history_exists(&self, base: &CurrencyCode, key: &str) -> anyhow::Result<bool>;

  /// Append a snapshot under `history/{base}/{key}`.
  async fn append_history(&self, snapshot: &RateSnapshot) -> anyhow::Result<()>;

  /// Load a single history entry.
  async fn history_entry(&self, base: &CurrencyCode, key: &str)
    -> anyhow::Result<Option<Quotes>>;

  /// Check if the underlying store is healthy.
  async fn is_healthy(&self) -> bool;
}
