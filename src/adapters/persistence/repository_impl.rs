//! Repository Implementation — Rate Layout over a Tree Store
//!
//! Maps the `RateRepository` port onto any `TreeStore`:
//! - `rates/{base}` → latest quotes
//! - `history/{base}/{YYYYMMDDHHMM}` → one snapshot per ingest cycle
//!
//! This is the hexagonal architecture glue: the usecases layer only
//! knows about the `RateRepository` trait, never about paths or JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::rates::{CurrencyCode, Quotes, RateSnapshot};
use crate::ports::repository::RateRepository;
use crate::ports::store::TreeStore;

/// Subtree holding the latest quotes per base.
pub const RATES_ROOT: &str = "rates";
/// Subtree holding per-cycle snapshots per base.
pub const HISTORY_ROOT: &str = "history";

/// Concrete repository adapter over a tree store.
pub struct TreeRateRepository<S: TreeStore + ?Sized> {
    store: Arc<S>,
}

impl<S: TreeStore + ?Sized> TreeRateRepository<S> {
    /// Create a new repository backed by `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn current_path(base: &CurrencyCode) -> String {
        format!("{RATES_ROOT}/{base}")
    }

    fn history_path(base: &CurrencyCode, key: &str) -> String {
        format!("{HISTORY_ROOT}/{base}/{key}")
    }

    async fn read_quotes(&self, path: &str) -> Result<Option<Quotes>> {
        match self.store.read(path).await? {
            Some(value) => {
                let quotes = serde_json::from_value(value)
                    .with_context(|| format!("Malformed quotes at {path}"))?;
                Ok(Some(quotes))
            }
            None => Ok(None),
        }
    }

    async fn write_quotes(&self, path: &str, quotes: &Quotes) -> Result<()> {
        let value: Value = serde_json::to_value(quotes).context("Failed to serialize quotes")?;
        self.store.write(path, value).await
    }
}

#[async_trait]
impl<S: TreeStore + ?Sized> RateRepository for TreeRateRepository<S> {
    async fn current(&self, base: &CurrencyCode) -> Result<Option<Quotes>> {
        self.read_quotes(&Self::current_path(base)).await
    }

    async fn save_current(&self, base: &CurrencyCode, quotes: &Quotes) -> Result<()> {
        self.write_quotes(&Self::current_path(base), quotes).await
    }

    async fn history_exists(&self, base: &CurrencyCode, key: &str) -> Result<bool> {
        Ok(self.store.read(&Self::history_path(base, key)).await?.is_some())
    }

    async fn append_history(&self, snapshot: &RateSnapshot) -> Result<()> {
        let path = Self::history_path(&snapshot.base_currency, &snapshot.history_key());
        self.write_quotes(&path, &snapshot.quotes).await
    }

    async fn history_entry(&self, base: &CurrencyCode, key: &str) -> Result<Option<Quotes>> {
        self.read_quotes(&Self::history_path(base, key)).await
    }

    async fn is_healthy(&self) -> bool {
        self.store.is_healthy().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryStore;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[tokio::test]
    async fn test_layout_matches_tree_paths() {
        let store = Arc::new(MemoryStore::new());
        let repo = TreeRateRepository::new(Arc::clone(&store));
        let sgd = CurrencyCode::parse("SGD").unwrap();

        let mut quotes = Quotes::new();
        quotes.insert(CurrencyCode::parse("USD").unwrap(), dec!(1.3514)).unwrap();
        repo.save_current(&sgd, &quotes).await.unwrap();

        let snapshot = RateSnapshot::new(
            sgd.clone(),
            quotes,
            chrono::DateTime::parse_from_rfc3339("2024-02-29T23:59:30Z")
                .unwrap()
                .into(),
        );
        repo.append_history(&snapshot).await.unwrap();

        assert_eq!(
            store.dump().await,
            json!({
                "rates": {"SGD": {"USD": 1.3514}},
                "history": {"SGD": {"202402292359": {"USD": 1.3514}}}
            })
        );
        assert!(repo.history_exists(&sgd, "202402292359").await.unwrap());
    }

    #[tokio::test]
    async fn test_quote_order_survives_round_trip() {
        let repo = TreeRateRepository::new(Arc::new(MemoryStore::new()));
        let sgd = CurrencyCode::parse("SGD").unwrap();
        let mut quotes = Quotes::new();
        quotes.insert(CurrencyCode::parse("USD").unwrap(), dec!(1.35)).unwrap();
        quotes.insert(CurrencyCode::parse("AUD").unwrap(), dec!(2.05)).unwrap();
        quotes.insert(CurrencyCode::parse("GBP").unwrap(), dec!(0.5714)).unwrap();
        repo.save_current(&sgd, &quotes).await.unwrap();

        let stored = repo.current(&sgd).await.unwrap().unwrap();
        let order: Vec<_> = stored.codes().map(CurrencyCode::as_str).collect();
        assert_eq!(order, vec!["USD", "AUD", "GBP"]);
        assert_eq!(stored, quotes);
    }

    #[tokio::test]
    async fn test_malformed_quotes_are_errors() {
        let store = Arc::new(MemoryStore::with_tree(json!({"rates": {"SGD": {"USD": "x"}}})));
        let repo = TreeRateRepository::new(store);
        let sgd = CurrencyCode::parse("SGD").unwrap();
        assert!(repo.current(&sgd).await.is_err());
    }
}
