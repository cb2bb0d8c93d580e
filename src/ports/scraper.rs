//! Rate Scraper Port - Source Page Extraction
//!
//! Scrapers return the two columns they found on a source page: long-form
//! currency names and raw rate cells. How they find them (HTML, JSON,
//! browser automation) is their business; pairing the columns up and
//! validating them is the ingestor's.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::errors::ScrapeError;

/// Column-oriented scrape result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScrapedTable {
  /// Long-form currency names, e.g. "US Dollar".
  pub names: Vec<String>,
  /// Raw rate cells, same order as `names`.
  pub rates: Vec<String>,
}

impl ScrapedTable {
  /// Build a table from `(name, rate)` rows.
  pub fn from_rows<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
    let (names, rates) = rows
      .into_iter()
      .map(|(n, r)| (n.to_string(), r.to_string()))
      .unzip();
    Self { names, rates }
  }

  /// Zip names with rates. Fails if the columns differ in length,
  /// which means the page layout changed under the scraper.
  pub fn into_mapping(self) -> Result<HashMap<String, String>, ScrapeError> {
    if self.names.len() != self.rates.len() {
      return Err(ScrapeError::ColumnMismatch {
        names: self.names.len(),
        rates: self.rates.len(),
      });
    }
    Ok(
      self
        .names
        .into_iter()
        .map(|n| n.trim().to_string())
        .zip(self.rates)
        .collect(),
    )
  }
}

/// Trait for rate scraping collaborators.
#[async_trait]
pub trait RateScraper: Send + Sync + 'static {
  /// Fetch one table of rates from the source.
  async fn scrape(&self) -> anyhow::Result<ScrapedTable>;
}
