//! Property-Based Tests — Ingest and Conversation Invariants
//!
//! Uses `proptest` to verify that normalization, the merge write policy
//! and the quick-reply menu hold across random inputs.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use fx_messenger_bot::adapters::persistence::{MemoryStore, TreeRateRepository};
use fx_messenger_bot::domain::conversation::{ConversationEngine, ALL_OPTION};
use fx_messenger_bot::domain::rates::{CurrencyCode, Quotes};
use fx_messenger_bot::domain::source::{CurrencyAlias, RateConvention, SourceProfile};
use fx_messenger_bot::ports::repository::RateRepository;
use fx_messenger_bot::ports::scraper::{RateScraper, ScrapedTable};
use fx_messenger_bot::usecases::RateIngestor;

const NAMES: [(&str, &str); 3] = [
    ("US Dollar", "USD"),
    ("Australian Dollar", "AUD"),
    ("Sterling Pound", "GBP"),
];

struct FixedScraper(ScrapedTable);

#[async_trait::async_trait]
impl RateScraper for FixedScraper {
    async fn scrape(&self) -> anyhow::Result<ScrapedTable> {
        Ok(self.0.clone())
    }
}

fn profile(count: usize) -> SourceProfile {
    SourceProfile {
        name: "bank".to_string(),
        base_currency: CurrencyCode::parse("SGD").unwrap(),
        convention: RateConvention::Inverted,
        currencies: NAMES[..count]
            .iter()
            .map(|(name, code)| CurrencyAlias {
                name: (*name).to_string(),
                code: CurrencyCode::parse(code).unwrap(),
            })
            .collect(),
    }
}

/// Raw page rates with four decimals in (0, 1000].
fn raw_rates(count: usize) -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(1i64..=10_000_000, count)
        .prop_map(|units| units.into_iter().map(|u| Decimal::new(u, 4)).collect())
}

fn table(raws: &[Decimal]) -> ScrapedTable {
    ScrapedTable {
        names: NAMES[..raws.len()].iter().map(|(n, _)| (*n).to_string()).collect(),
        rates: raws.iter().map(Decimal::to_string).collect(),
    }
}

fn minute(m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, m, 0).unwrap()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

// ── Ingest Properties ───────────────────────────────────────

proptest! {
    /// Stored rates equal round(1/raw, 4) on the inverted path.
    #[test]
    fn inverted_rates_round_trip_through_store(raws in raw_rates(3)) {
        let current = block_on(async {
            let repo = Arc::new(TreeRateRepository::new(Arc::new(MemoryStore::new())));
            RateIngestor::new(Arc::clone(&repo))
                .ingest(&profile(3), &FixedScraper(table(&raws)), minute(0))
                .await
                .unwrap();
            repo.current(&CurrencyCode::parse("SGD").unwrap()).await.unwrap().unwrap()
        });

        for ((_, code), raw) in NAMES.iter().zip(&raws) {
            let expected = (Decimal::ONE / raw).round_dp(4).normalize();
            prop_assert_eq!(current.get(code), Some(expected));
        }
    }

    /// Re-ingesting the same scrape leaves `current` unchanged and adds
    /// exactly one history entry.
    #[test]
    fn reingest_is_idempotent(raws in raw_rates(3)) {
        let (first, second, history) = block_on(async {
            let store = Arc::new(MemoryStore::new());
            let repo = Arc::new(TreeRateRepository::new(Arc::clone(&store)));
            let ingestor = RateIngestor::new(Arc::clone(&repo));
            let scraper = FixedScraper(table(&raws));
            let base = CurrencyCode::parse("SGD").unwrap();

            ingestor.ingest(&profile(3), &scraper, minute(0)).await.unwrap();
            let first = repo.current(&base).await.unwrap();
            ingestor.ingest(&profile(3), &scraper, minute(10)).await.unwrap();
            let second = repo.current(&base).await.unwrap();

            let history = store.dump().await["history"]["SGD"]
                .as_object()
                .map_or(0, serde_json::Map::len);
            (first, second, history)
        });

        prop_assert_eq!(first, second);
        prop_assert_eq!(history, 2);
    }

    /// A partial snapshot overwrites only its own currencies.
    #[test]
    fn partial_snapshot_preserves_other_rates(
        full in raw_rates(3),
        partial in raw_rates(1),
    ) {
        let current = block_on(async {
            let repo = Arc::new(TreeRateRepository::new(Arc::new(MemoryStore::new())));
            let ingestor = RateIngestor::new(Arc::clone(&repo));
            ingestor.ingest(&profile(3), &FixedScraper(table(&full)), minute(0)).await.unwrap();
            ingestor.ingest(&profile(1), &FixedScraper(table(&partial)), minute(1)).await.unwrap();
            repo.current(&CurrencyCode::parse("SGD").unwrap()).await.unwrap().unwrap()
        });

        let invert = |raw: &Decimal| (Decimal::ONE / raw).round_dp(4).normalize();
        prop_assert_eq!(current.len(), 3);
        prop_assert_eq!(current.get("USD"), Some(invert(&partial[0])));
        prop_assert_eq!(current.get("AUD"), Some(invert(&full[1])));
        prop_assert_eq!(current.get("GBP"), Some(invert(&full[2])));
    }
}

// ── Conversation Properties ─────────────────────────────────

proptest! {
    /// The menu lists every snapshot code plus "All", each exactly once.
    #[test]
    fn menu_is_complete(
        codes in prop::collection::btree_set("[A-Z]{3}", 1..12),
        units in 1i64..1_000_000,
    ) {
        let mut quotes = Quotes::new();
        for code in &codes {
            quotes.insert(CurrencyCode::parse(code).unwrap(), Decimal::new(units, 4)).unwrap();
        }

        let menu = ConversationEngine::menu(&quotes);
        let mut payloads: Vec<&str> = menu.iter().map(|o| o.payload.as_str()).collect();
        prop_assert_eq!(payloads.len(), codes.len() + 1);
        prop_assert_eq!(payloads.pop(), Some(ALL_OPTION));
        let listed: Vec<&str> = codes.iter().map(String::as_str).collect();
        prop_assert_eq!(payloads, listed);
    }

    /// Direct rates are stored rounded, never inverted.
    #[test]
    fn direct_convention_only_rounds(units in 1i64..=100_000_000) {
        let raw = Decimal::new(units, 6);
        let stored = RateConvention::Direct.normalize(raw);
        let expected = raw.round_dp(4).normalize();
        if expected.is_zero() {
            prop_assert_eq!(stored, None);
        } else {
            prop_assert_eq!(stored, Some(expected));
        }
    }
}
