//! Rate Ingestor - Scrape, Normalize, Store
//!
//! One ingest cycle:
//! 1. Scrape the source table (abort on failure or column mismatch)
//! 2. Map long-form names to codes and normalize rates per the profile
//! 3. Refuse to overwrite an existing history entry for this minute
//! 4. Merge into `current[base]` (per-key last write wins) and save it
//! 5. Append the full snapshot to `history[base]`
//!
//! Steps 1-2 (`collect`) never write, so a failed scrape or an incomplete
//! name table leaves `current` untouched. Steps 3-5 (`store`) take quotes
//! already merged from every source of one base, so several providers
//! can feed the same base within one minute.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::domain::errors::{IngestError, ScrapeError};
use crate::domain::rates::{CurrencyCode, Quotes, RateSnapshot};
use crate::domain::source::SourceProfile;
use crate::ports::repository::RateRepository;
use crate::ports::scraper::RateScraper;

/// Runs ingest cycles against a rate repository.
pub struct RateIngestor<R: RateRepository + ?Sized> {
  repository: Arc<R>,
}

impl<R: RateRepository + ?Sized> RateIngestor<R> {
  /// Create a new ingestor writing to `repository`.
  pub fn new(repository: Arc<R>) -> Self {
    Self { repository }
  }

  /// Run one ingest cycle for a single source, stamped with `captured_at`.
  pub async fn ingest(
    &self,
    profile: &SourceProfile,
    scraper: &dyn RateScraper,
    captured_at: DateTime<Utc>,
  ) -> Result<RateSnapshot, IngestError> {
    let quotes = self.collect(profile, scraper).await?;
    self.store(&profile.base_currency, quotes, captured_at).await
  }

  /// Scrape and normalize one source. Never writes.
  #[instrument(skip(self, profile, scraper), fields(source = %profile.name, base = %profile.base_currency))]
  pub async fn collect(
    &self,
    profile: &SourceProfile,
    scraper: &dyn RateScraper,
  ) -> Result<Quotes, IngestError> {
    let table = scraper
      .scrape()
      .await
      .map_err(ScrapeError::Source)?;
    let mapping = table.into_mapping()?;
    profile.normalize(&mapping)
  }

  /// Write `quotes` for `base` as the snapshot of `captured_at`.
  #[instrument(skip(self, quotes), fields(quotes = quotes.len()))]
  pub async fn store(
    &self,
    base: &CurrencyCode,
    quotes: Quotes,
    captured_at: DateTime<Utc>,
  ) -> Result<RateSnapshot, IngestError> {
    let snapshot = RateSnapshot::new(base.clone(), quotes, captured_at);
    let key = snapshot.history_key();

    if self
      .repository
      .history_exists(base, &key)
      .await
      .map_err(IngestError::Store)?
    {
      return Err(IngestError::DuplicateSnapshot {
        base: base.to_string(),
        key,
      });
    }

    let mut current = self
      .repository
      .current(base)
      .await
      .map_err(IngestError::Store)?
      .unwrap_or_default();
    current.merge(&snapshot.quotes);

    self
      .repository
      .save_current(base, &current)
      .await
      .map_err(IngestError::Store)?;
    self
      .repository
      .append_history(&snapshot)
      .await
      .map_err(IngestError::Store)?;

    for (quote, rate) in snapshot.quotes.iter() {
      info!("1 {base} is to {rate} {quote}");
    }
    info!(
      history_key = %key,
      quotes = snapshot.quotes.len(),
      current_quotes = current.len(),
      "Ingest cycle stored"
    );

    Ok(snapshot)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::persistence::{MemoryStore, TreeRateRepository};
  use crate::ports::scraper::ScrapedTable;
  use async_trait::async_trait;
  use chrono::TimeZone;
  use rust_decimal_macros::dec;

  struct FixedScraper(ScrapedTable);

  #[async_trait]
  impl RateScraper for FixedScraper {
    async fn scrape(&self) -> anyhow::Result<ScrapedTable> {
      Ok(self.0.clone())
    }
  }

  struct FailingScraper;

  #[async_trait]
  impl RateScraper for FailingScraper {
    async fn scrape(&self) -> anyhow::Result<ScrapedTable> {
      anyhow::bail!("connection reset")
    }
  }

  fn dbs_rows() -> ScrapedTable {
    ScrapedTable::from_rows([
      ("Australian Dollar", "0.4878"),
      ("US Dollar", "0.74"),
      ("Sterling Pound", "1.7500"),
    ])
  }

  fn repo() -> Arc<TreeRateRepository<MemoryStore>> {
    Arc::new(TreeRateRepository::new(Arc::new(MemoryStore::new())))
  }

  fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 13).unwrap()
  }

  #[tokio::test]
  async fn test_ingest_writes_current_and_history() {
    let repo = repo();
    let ingestor = RateIngestor::new(Arc::clone(&repo));
    let profile = SourceProfile::dbs();

    let snapshot = ingestor
      .ingest(&profile, &FixedScraper(dbs_rows()), at(5))
      .await
      .unwrap();

    assert_eq!(snapshot.history_key(), "202405010905");
    let current = repo.current(&profile.base_currency).await.unwrap().unwrap();
    assert_eq!(current.get("USD"), Some(dec!(1.3514)));
    assert_eq!(current.get("GBP"), Some(dec!(0.5714)));
    let history = repo
      .history_entry(&profile.base_currency, "202405010905")
      .await
      .unwrap();
    assert_eq!(history, Some(current));
  }

  #[tokio::test]
  async fn test_scrape_failure_writes_nothing() {
    let repo = repo();
    let ingestor = RateIngestor::new(Arc::clone(&repo));
    let profile = SourceProfile::dbs();

    let err = ingestor
      .ingest(&profile, &FailingScraper, at(5))
      .await
      .unwrap_err();
    assert!(matches!(err, IngestError::Scrape(ScrapeError::Source(_))));
    assert!(repo.current(&profile.base_currency).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_unknown_currency_keeps_previous_current() {
    let repo = repo();
    let ingestor = RateIngestor::new(Arc::clone(&repo));
    let profile = SourceProfile::dbs();
    ingestor
      .ingest(&profile, &FixedScraper(dbs_rows()), at(5))
      .await
      .unwrap();
    let before = repo.current(&profile.base_currency).await.unwrap();

    let partial = ScrapedTable::from_rows([("US Dollar", "0.70")]);
    let err = ingestor
      .ingest(&profile, &FixedScraper(partial), at(6))
      .await
      .unwrap_err();

    assert!(matches!(err, IngestError::UnknownCurrency { .. }));
    assert_eq!(repo.current(&profile.base_currency).await.unwrap(), before);
    assert!(
      !repo
        .history_exists(&profile.base_currency, "202405010906")
        .await
        .unwrap()
    );
  }

  #[tokio::test]
  async fn test_same_minute_is_rejected() {
    let repo = repo();
    let ingestor = RateIngestor::new(Arc::clone(&repo));
    let profile = SourceProfile::dbs();
    ingestor
      .ingest(&profile, &FixedScraper(dbs_rows()), at(5))
      .await
      .unwrap();

    let err = ingestor
      .ingest(&profile, &FixedScraper(dbs_rows()), at(5))
      .await
      .unwrap_err();
    assert!(matches!(err, IngestError::DuplicateSnapshot { .. }));
  }
}
