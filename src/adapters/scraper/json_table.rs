//! JSON Table Scraper
//!
//! Fetches a pre-extracted column table `{"names": [...], "rates": [...]}`
//! from an HTTP endpoint. Page rendering and cell extraction happen
//! upstream of this adapter.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::ports::scraper::{RateScraper, ScrapedTable};

/// Scraper reading a column table over HTTP.
pub struct JsonTableScraper {
  http: Client,
  url: String,
}

impl JsonTableScraper {
  /// Create a scraper for `url`.
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let http = Client::builder()
      .timeout(timeout)
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self {
      http,
      url: url.into(),
    })
  }
}

#[async_trait]
impl RateScraper for JsonTableScraper {
  #[instrument(skip(self), fields(url = %self.url))]
  async fn scrape(&self) -> Result<ScrapedTable> {
    let table: ScrapedTable = self
      .http
      .get(&self.url)
      .send()
      .await
      .with_context(|| format!("Request to {} failed", self.url))?
      .error_for_status()
      .with_context(|| format!("Source {} returned an error status", self.url))?
      .json()
      .await
      .context("Source did not return a names/rates table")?;

    debug!(
      names = table.names.len(),
      rates = table.rates.len(),
      "Scraped rate table"
    );
    Ok(table)
  }
}
