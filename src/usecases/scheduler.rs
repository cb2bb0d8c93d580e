//! Ingest Scheduler - Periodic Scrape Cycles
//!
//! Runs every configured source once per interval, one after another in
//! a single task. Cycles never overlap (missed ticks are skipped), so
//! writes for one base currency are always serial. Sources that share a
//! base are merged into a single snapshot per pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::errors::{IngestError, ScrapeError};
use crate::domain::rates::{CurrencyCode, Quotes};
use crate::domain::source::SourceProfile;
use crate::ports::repository::RateRepository;
use crate::ports::scraper::RateScraper;

use super::ingest::RateIngestor;

/// A source profile paired with the scraper that reads it.
pub struct IngestSource {
  pub profile: SourceProfile,
  pub scraper: Arc<dyn RateScraper>,
}

/// Outcome counts of one pass over all sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
  pub succeeded: usize,
  pub failed: usize,
}

/// Periodically ingests every source.
pub struct IngestScheduler<R: RateRepository + ?Sized> {
  ingestor: RateIngestor<R>,
  sources: Vec<IngestSource>,
  interval: Duration,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl<R: RateRepository + ?Sized> IngestScheduler<R> {
  /// Create a scheduler over `sources`, ticking every `interval`.
  pub fn new(repository: Arc<R>, sources: Vec<IngestSource>, interval: Duration) -> Self {
    Self {
      ingestor: RateIngestor::new(repository),
      sources,
      interval,
      metrics: None,
    }
  }

  /// Attach a metrics registry.
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Run one pass over all sources. Failures are logged and counted;
  /// one failing source never stops the others.
  ///
  /// Sources sharing a base currency are collected first and stored as
  /// one snapshot, later sources winning on overlapping codes.
  pub async fn run_cycle(&self) -> CycleReport {
    let cycle_id = Uuid::new_v4();
    let captured_at = Utc::now();
    let mut report = CycleReport::default();

    for (base, sources) in self.groups() {
      let span = info_span!("ingest_cycle", %cycle_id, %base);
      let report = &mut report;
      async move {
        let mut merged = Quotes::new();
        let mut collected = Vec::with_capacity(sources.len());
        for source in sources {
          let name = source.profile.name.as_str();
          match self
            .ingestor
            .collect(&source.profile, source.scraper.as_ref())
            .await
          {
            Ok(quotes) => {
              merged.merge(&quotes);
              collected.push(name);
            }
            Err(e) => {
              report.failed += 1;
              self.record_failure(name, &e);
            }
          }
        }
        if collected.is_empty() {
          return;
        }

        match self.ingestor.store(base, merged, captured_at).await {
          Ok(snapshot) => {
            report.succeeded += collected.len();
            if let Some(metrics) = &self.metrics {
              for name in &collected {
                metrics.record_snapshot(name, &snapshot);
              }
            }
          }
          Err(e) => {
            report.failed += collected.len();
            for name in &collected {
              self.record_failure(name, &e);
            }
          }
        }
      }
      .instrument(span)
      .await;
    }

    report
  }

  /// Sources grouped by base currency, in first-seen order.
  fn groups(&self) -> Vec<(&CurrencyCode, Vec<&IngestSource>)> {
    let mut groups: Vec<(&CurrencyCode, Vec<&IngestSource>)> = Vec::new();
    for source in &self.sources {
      let base = &source.profile.base_currency;
      match groups.iter_mut().find(|(b, _)| *b == base) {
        Some((_, members)) => members.push(source),
        None => groups.push((base, vec![source])),
      }
    }
    groups
  }

  fn record_failure(&self, source: &str, error: &IngestError) {
    match error {
      IngestError::DuplicateSnapshot { .. } => {
        warn!(source, error = %error, "Ingest skipped");
      }
      _ => {
        error!(source, error = %error, "Ingest failed");
      }
    }
    if let Some(metrics) = &self.metrics {
      metrics
        .ingest_cycles
        .with_label_values(&[source, outcome_label(error)])
        .inc();
    }
  }

  /// Tick until shutdown. The first cycle runs immediately.
  #[instrument(skip(self, shutdown_rx), fields(sources = self.sources.len()))]
  pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
      interval_secs = self.interval.as_secs(),
      "Ingest scheduler started"
    );

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Ingest scheduler received shutdown signal");
          break;
        }
        _ = ticker.tick() => {
          let report = self.run_cycle().await;
          info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Ingest pass complete"
          );
        }
      }
    }
  }
}

/// Metric label for a failed ingest.
fn outcome_label(error: &IngestError) -> &'static str {
  match error {
    IngestError::Scrape(ScrapeError::ColumnMismatch { .. }) => "column_mismatch",
    IngestError::Scrape(_) => "scrape",
    IngestError::UnknownCurrency { .. } => "unknown_currency",
    IngestError::DuplicateSnapshot { .. } => "duplicate",
    IngestError::Quote(_) => "invalid_quote",
    IngestError::Store(_) => "store",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::persistence::{MemoryStore, TreeRateRepository};
  use crate::domain::source::CurrencyAlias;
  use crate::ports::scraper::ScrapedTable;
  use async_trait::async_trait;

  struct TableScraper(ScrapedTable);

  #[async_trait]
  impl RateScraper for TableScraper {
    async fn scrape(&self) -> anyhow::Result<ScrapedTable> {
      Ok(self.0.clone())
    }
  }

  #[tokio::test]
  async fn test_failing_source_does_not_block_others() {
    let repo = Arc::new(TreeRateRepository::new(Arc::new(MemoryStore::new())));
    let good = IngestSource {
      profile: SourceProfile::dbs(),
      scraper: Arc::new(TableScraper(ScrapedTable::from_rows([
        ("Australian Dollar", "0.4878"),
        ("US Dollar", "0.74"),
        ("Sterling Pound", "1.75"),
      ]))),
    };
    let broken = IngestSource {
      profile: SourceProfile::dbs(),
      scraper: Arc::new(TableScraper(ScrapedTable {
        names: vec!["US Dollar".into()],
        rates: vec![],
      })),
    };
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let scheduler = IngestScheduler::new(
      Arc::clone(&repo),
      vec![broken, good],
      Duration::from_secs(600),
    )
    .with_metrics(Arc::clone(&metrics));

    let report = scheduler.run_cycle().await;

    assert_eq!(report, CycleReport { succeeded: 1, failed: 1 });
    let base = SourceProfile::dbs().base_currency;
    assert!(repo.current(&base).await.unwrap().is_some());
    assert_eq!(
      metrics
        .ingest_cycles
        .with_label_values(&["dbs", "column_mismatch"])
        .get(),
      1
    );
  }

  #[tokio::test]
  async fn test_sources_sharing_a_base_are_stored_together() {
    let store = Arc::new(MemoryStore::new());
    let repo = Arc::new(TreeRateRepository::new(Arc::clone(&store)));
    let dbs = IngestSource {
      profile: SourceProfile::dbs(),
      scraper: Arc::new(TableScraper(ScrapedTable::from_rows([
        ("Australian Dollar", "0.4878"),
        ("US Dollar", "0.74"),
        ("Sterling Pound", "1.75"),
      ]))),
    };
    let mut yen_profile = SourceProfile::dbs();
    yen_profile.name = "yen-desk".to_string();
    yen_profile.currencies = vec![CurrencyAlias {
      name: "Yen".to_string(),
      code: CurrencyCode::parse("JPY").unwrap(),
    }];
    let yen = IngestSource {
      profile: yen_profile,
      scraper: Arc::new(TableScraper(ScrapedTable::from_rows([("Yen", "0.0125")]))),
    };
    let scheduler = IngestScheduler::new(Arc::clone(&repo), vec![dbs, yen], Duration::from_secs(600));

    let report = scheduler.run_cycle().await;

    assert_eq!(report, CycleReport { succeeded: 2, failed: 0 });
    let current = repo
      .current(&SourceProfile::dbs().base_currency)
      .await
      .unwrap()
      .unwrap();
    let order: Vec<_> = current.codes().map(CurrencyCode::as_str).collect();
    assert_eq!(order, vec!["AUD", "USD", "GBP", "JPY"]);
    assert_eq!(current.get("JPY"), Some(rust_decimal_macros::dec!(80)));

    let history = store.dump().await["history"]["SGD"].clone();
    let entries = history.as_object().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries.values().next().unwrap().as_object().unwrap().len(), 4);
  }

  #[tokio::test]
  async fn test_run_stops_on_shutdown() {
    let repo = Arc::new(TreeRateRepository::new(Arc::new(MemoryStore::new())));
    let scheduler = IngestScheduler::new(repo, Vec::new(), Duration::from_secs(3600));
    let (tx, rx) = broadcast::channel(1);
    let handle = tokio::spawn(scheduler.run(rx));
    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
      .await
      .unwrap()
      .unwrap();
  }
}
