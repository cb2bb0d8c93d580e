//! Core rate domain types.
//!
//! Defines currency codes, ordered quote maps, and timestamped snapshots.
//! Rates are `Decimal` internally; on the storage boundary they travel as
//! plain JSON numbers so the tree store stays human-readable.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::{self, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::QuoteError;

/// Format of the history key under `history/{base}/`.
pub const HISTORY_KEY_FORMAT: &str = "%Y%m%d%H%M";

/// Three-letter currency code (ISO 4217-like), always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(pub(super) String);

impl CurrencyCode {
    /// Parse a code, accepting surrounding whitespace and lower case.
    pub fn parse(raw: &str) -> Result<Self, QuoteError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(QuoteError::InvalidCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = QuoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Nearest `f64` to a rate, via its decimal string so that e.g. `1.3514`
/// maps to exactly the same double as the literal `1.3514`.
pub fn rate_to_f64(rate: Decimal) -> Option<f64> {
    rate.normalize().to_string().parse().ok()
}

/// Ordered mapping of quote currency to rate ("1 base buys `rate` quote").
///
/// Keeps insertion order so menus and listings follow the order the
/// rates were scraped in. Keys are distinct and every rate is > 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quotes {
    entries: Vec<(CurrencyCode, Decimal)>,
}

impl Quotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a rate. Overwrites keep the original position.
    pub fn insert(&mut self, code: CurrencyCode, rate: Decimal) -> Result<(), QuoteError> {
        if rate <= Decimal::ZERO {
            return Err(QuoteError::NonPositive { code: code.to_string(), rate });
        }
        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = rate,
            None => self.entries.push((code, rate)),
        }
        Ok(())
    }

    /// Look up a rate by its code string, exact match.
    pub fn get(&self, code: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|(c, _)| c.as_str() == code)
            .map(|(_, rate)| *rate)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, Decimal)> {
        self.entries.iter().map(|(c, r)| (c, *r))
    }

    pub fn codes(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.entries.iter().map(|(c, _)| c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last-write-wins merge: every key in `newer` overwrites ours,
    /// keys only we have are preserved, unseen keys are appended.
    pub fn merge(&mut self, newer: &Self) {
        for (code, rate) in &newer.entries {
            match self.entries.iter_mut().find(|(c, _)| c == code) {
                Some(entry) => entry.1 = *rate,
                None => self.entries.push((code.clone(), *rate)),
            }
        }
    }
}

impl TryFrom<Vec<(CurrencyCode, Decimal)>> for Quotes {
    type Error = QuoteError;

    fn try_from(pairs: Vec<(CurrencyCode, Decimal)>) -> Result<Self, Self::Error> {
        let mut quotes = Self::new();
        for (code, rate) in pairs {
            if quotes.contains(code.as_str()) {
                return Err(QuoteError::Duplicate(code.to_string()));
            }
            quotes.insert(code, rate)?;
        }
        Ok(quotes)
    }
}

impl Serialize for Quotes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (code, rate) in &self.entries {
            let value = rate_to_f64(*rate)
                .ok_or_else(|| ser::Error::custom(format!("rate {rate} not representable")))?;
            map.serialize_entry(code.as_str(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Quotes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(QuotesVisitor)
    }
}

struct QuotesVisitor;

impl<'de> Visitor<'de> for QuotesVisitor {
    type Value = Quotes;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of currency code to positive rate")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Quotes, A::Error> {
        let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((code, rate)) = access.next_entry::<String, RateValue>()? {
            let code = CurrencyCode::parse(&code).map_err(de::Error::custom)?;
            pairs.push((code, rate.0));
        }
        Quotes::try_from(pairs).map_err(de::Error::custom)
    }
}

/// A rate read from storage: JSON number or numeric string.
struct RateValue(Decimal);

impl<'de> Deserialize<'de> for RateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RateValueVisitor)
    }
}

struct RateValueVisitor;

impl Visitor<'_> for RateValueVisitor {
    type Value = RateValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a numeric rate")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RateValue, E> {
        Ok(RateValue(Decimal::from(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RateValue, E> {
        Ok(RateValue(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RateValue, E> {
        // f64 Display is the shortest round-trip form, so 1.3514 stays 1.3514.
        self.visit_str(&v.to_string())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RateValue, E> {
        Decimal::from_str(v.trim())
            .map(RateValue)
            .map_err(|e| E::custom(format!("invalid rate {v:?}: {e}")))
    }
}

/// One scrape cycle's quotes for a base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub base_currency: CurrencyCode,
    pub quotes: Quotes,
    /// Minute-granularity capture time.
    pub captured_at: DateTime<Utc>,
}

impl RateSnapshot {
    pub fn new(base_currency: CurrencyCode, quotes: Quotes, captured_at: DateTime<Utc>) -> Self {
        let captured_at = captured_at
            .duration_trunc(TimeDelta::minutes(1))
            .unwrap_or(captured_at);
        Self {
            base_currency,
            quotes,
            captured_at,
        }
    }

    /// Key of this snapshot under `history/{base}/`.
    pub fn history_key(&self) -> String {
        self.captured_at.format(HISTORY_KEY_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    #[test]
    fn test_currency_code_normalizes_case() {
        assert_eq!(code(" usd ").as_str(), "USD");
        assert!(CurrencyCode::parse("All").is_err());
        assert!(CurrencyCode::parse("US").is_err());
    }

    #[test]
    fn test_insert_rejects_non_positive() {
        let mut quotes = Quotes::new();
        assert!(quotes.insert(code("USD"), dec!(0)).is_err());
        assert!(quotes.insert(code("USD"), dec!(-1.2)).is_err());
        assert!(quotes.is_empty());
    }

    #[test]
    fn test_merge_overwrites_and_preserves() {
        let mut current = Quotes::new();
        current.insert(code("USD"), dec!(1.35)).unwrap();
        current.insert(code("AUD"), dec!(2.05)).unwrap();

        let mut newer = Quotes::new();
        newer.insert(code("AUD"), dec!(2.10)).unwrap();
        newer.insert(code("GBP"), dec!(0.57)).unwrap();

        current.merge(&newer);

        let order: Vec<_> = current.codes().map(CurrencyCode::as_str).collect();
        assert_eq!(order, vec!["USD", "AUD", "GBP"]);
        assert_eq!(current.get("USD"), Some(dec!(1.35)));
        assert_eq!(current.get("AUD"), Some(dec!(2.10)));
    }

    #[test]
    fn test_json_keeps_order_and_values() {
        let quotes: Quotes = serde_json::from_str(r#"{"USD": 1.3514, "AUD": 2.05}"#).unwrap();
        let order: Vec<_> = quotes.codes().map(CurrencyCode::as_str).collect();
        assert_eq!(order, vec!["USD", "AUD"]);
        assert_eq!(quotes.get("USD"), Some(dec!(1.3514)));

        let json = serde_json::to_string(&quotes).unwrap();
        assert_eq!(json, r#"{"USD":1.3514,"AUD":2.05}"#);
    }

    #[test]
    fn test_json_rejects_bad_rates() {
        assert!(serde_json::from_str::<Quotes>(r#"{"USD": 0}"#).is_err());
        assert!(serde_json::from_str::<Quotes>(r#"{"USD": "abc"}"#).is_err());
        assert!(serde_json::from_str::<Quotes>(r#"{"DOLLAR": 1.2}"#).is_err());
    }

    #[test]
    fn test_snapshot_truncates_to_minute() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 7, 42).unwrap();
        let snapshot = RateSnapshot::new(code("SGD"), Quotes::new(), at);
        assert_eq!(snapshot.history_key(), "202403091407");
        assert_eq!(
            snapshot.captured_at,
            Utc.with_ymd_and_hms(2024, 3, 9, 14, 7, 0).unwrap()
        );
    }
}
