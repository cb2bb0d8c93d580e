//! Scrape source profiles.
//!
//! A profile is pure data: which base currency the page prices against,
//! which long-form names map to which codes, and whether the page quotes
//! foreign→base (needs inverting) or base→foreign. Several providers can
//! share the ingestion pipeline by differing only in their profile.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::errors::{IngestError, ScrapeError};
use super::rates::{CurrencyCode, Quotes};

/// Decimal places kept for stored rates.
pub const RATE_DECIMALS: u32 = 4;

/// Direction in which a source page expresses its rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateConvention {
    /// Page shows "1 foreign = X base"; stored value is `1 / X`.
    Inverted,
    /// Page already shows "1 base = X foreign".
    Direct,
}

impl RateConvention {
    /// Convert a raw page rate into "1 base buys X quote", rounded to
    /// four decimal places. Returns `None` for non-positive input.
    pub fn normalize(self, raw: Decimal) -> Option<Decimal> {
        if raw <= Decimal::ZERO {
            return None;
        }
        let value = match self {
            Self::Inverted => Decimal::ONE.checked_div(raw)?,
            Self::Direct => raw,
        };
        let rounded = value.round_dp(RATE_DECIMALS).normalize();
        (rounded > Decimal::ZERO).then_some(rounded)
    }
}

/// One row of a name→code lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrencyAlias {
    /// Long-form name as printed on the source page.
    pub name: String,
    pub code: CurrencyCode,
}

/// Everything the ingestor needs to know about a source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceProfile {
    pub name: String,
    pub base_currency: CurrencyCode,
    pub convention: RateConvention,
    /// Required currencies, in the order they should be stored.
    pub currencies: Vec<CurrencyAlias>,
}

impl SourceProfile {
    /// Profile of the DBS foreign exchange page (Selling TT/OD column).
    pub fn dbs() -> Self {
        let alias = |name: &str, code: &str| CurrencyAlias {
            name: name.to_string(),
            code: CurrencyCode(code.to_string()),
        };
        Self {
            name: "dbs".to_string(),
            base_currency: CurrencyCode("SGD".to_string()),
            convention: RateConvention::Inverted,
            currencies: vec![
                alias("Australian Dollar", "AUD"),
                alias("US Dollar", "USD"),
                alias("Sterling Pound", "GBP"),
            ],
        }
    }

    /// Map and normalize a scraped name→raw-rate table into quotes.
    ///
    /// Every alias in the profile is required; names the profile does not
    /// know are ignored without being parsed.
    pub fn normalize(&self, scraped: &HashMap<String, String>) -> Result<Quotes, IngestError> {
        let mut quotes = Quotes::new();
        for alias in &self.currencies {
            let raw = scraped
                .get(alias.name.as_str())
                .ok_or_else(|| IngestError::UnknownCurrency {
                    name: alias.name.clone(),
                })?;
            let invalid = || ScrapeError::InvalidRate {
                name: alias.name.clone(),
                raw: raw.clone(),
            };
            let parsed = parse_raw_rate(raw).ok_or_else(invalid)?;
            let rate = self.convention.normalize(parsed).ok_or_else(invalid)?;
            quotes.insert(alias.code.clone(), rate)?;
        }
        Ok(quotes)
    }
}

/// Parse a rate cell such as `" 0.7400 "` or `"1,234.50"`.
fn parse_raw_rate(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned).ok()
}
