//! Hot-Path Benchmarks — Rate Normalization and Reply Rendering
//!
//! Benchmarks the pure domain work done on every ingest cycle and every
//! inbound chat event.
//!
//! Run with: cargo bench --bench conversation_bench

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

use fx_messenger_bot::domain::conversation::{ConversationEngine, ConversationEvent};
use fx_messenger_bot::domain::rates::{CurrencyCode, Quotes};
use fx_messenger_bot::domain::source::SourceProfile;

fn sgd_quotes(count: usize) -> Quotes {
    let mut quotes = Quotes::new();
    for i in 0..count {
        let code = format!(
            "{}{}A",
            char::from(b'A' + (i / 26) as u8),
            char::from(b'A' + (i % 26) as u8)
        );
        quotes
            .insert(CurrencyCode::parse(&code).unwrap(), Decimal::new(13514 + i as i64, 4))
            .unwrap();
    }
    quotes
}

/// Benchmark name mapping + inversion for the DBS profile.
fn bench_normalize(c: &mut Criterion) {
    let profile = SourceProfile::dbs();
    let scraped: HashMap<String, String> = [
        ("Australian Dollar", "0.4878"),
        ("US Dollar", "0.7400"),
        ("Sterling Pound", "1.7500"),
        ("Japanese Yen", "0.0120"),
    ]
    .into_iter()
    .map(|(n, r)| (n.to_string(), r.to_string()))
    .collect();

    c.bench_function("normalize_dbs_table", |b| {
        b.iter(|| profile.normalize(black_box(&scraped)).unwrap());
    });
}

/// Benchmark the "All" answer over a full-size snapshot.
fn bench_all_rates_reply(c: &mut Criterion) {
    let engine = ConversationEngine::new(CurrencyCode::parse("SGD").unwrap());
    let quotes = sgd_quotes(30);
    let event = ConversationEvent::quick_reply("user", "All");

    c.bench_function("respond_all_30_quotes", |b| {
        b.iter(|| engine.respond(black_box(&event), Some(&quotes)).unwrap());
    });
}

/// Benchmark menu rendering for a freeform message.
fn bench_menu(c: &mut Criterion) {
    let engine = ConversationEngine::new(CurrencyCode::parse("SGD").unwrap());
    let quotes = sgd_quotes(12);
    let event = ConversationEvent::freeform("user");

    c.bench_function("respond_menu_12_quotes", |b| {
        b.iter(|| engine.respond(black_box(&event), Some(&quotes)).unwrap());
    });
}

criterion_group!(benches, bench_normalize, bench_all_rates_reply, bench_menu);
criterion_main!(benches);
