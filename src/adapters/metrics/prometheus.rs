//! Prometheus Metrics Registry - Bot Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers ingest cycles, stored rates, webhook traffic and outbound
//! send outcomes.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::domain::rates::{rate_to_f64, RateSnapshot};

/// Centralized Prometheus metrics for the rate bot.
///
/// All metrics follow the naming convention `fx_bot_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Ingest cycles by source and outcome (ok, scrape, unknown_currency, ...).
    pub ingest_cycles: IntCounterVec,
    /// Latest stored rate per base/quote pair.
    pub stored_rate: GaugeVec,
    /// Inbound webhook events by kind (freeform, quick_reply, skipped).
    pub webhook_events: IntCounterVec,
    /// Outbound sends by outcome (sent, failed).
    pub messages_forwarded: IntCounterVec,
    /// Webhook delivery handling latency in milliseconds.
    pub delivery_latency_ms: HistogramVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let ingest_cycles = IntCounterVec::new(
            Opts::new("fx_bot_ingest_cycles_total", "Ingest cycles by outcome"),
            &["source", "outcome"],
        )?;

        let stored_rate = GaugeVec::new(
            Opts::new(
                "fx_bot_stored_rate",
                "Most recently ingested rate (1 base buys X quote)",
            ),
            &["base", "quote"],
        )?;

        let webhook_events = IntCounterVec::new(
            Opts::new("fx_bot_webhook_events_total", "Inbound messaging events"),
            &["kind"],
        )?;

        let messages_forwarded = IntCounterVec::new(
            Opts::new(
                "fx_bot_messages_forwarded_total",
                "Outbound messages by send outcome",
            ),
            &["outcome"],
        )?;

        let delivery_latency_ms = HistogramVec::new(
            HistogramOpts::new(
                "fx_bot_delivery_latency_ms",
                "Webhook delivery handling latency in milliseconds",
            )
            .buckets(vec![5.0, 25.0, 100.0, 250.0, 1000.0, 5000.0]),
            &["status"],
        )?;

        // Register all metrics
        registry.register(Box::new(ingest_cycles.clone()))?;
        registry.register(Box::new(stored_rate.clone()))?;
        registry.register(Box::new(webhook_events.clone()))?;
        registry.register(Box::new(messages_forwarded.clone()))?;
        registry.register(Box::new(delivery_latency_ms.clone()))?;

        Ok(Self {
            registry,
            ingest_cycles,
            stored_rate,
            webhook_events,
            messages_forwarded,
            delivery_latency_ms,
        })
    }

    /// Record a successful ingest and publish its rates.
    pub fn record_snapshot(&self, source: &str, snapshot: &RateSnapshot) {
        self.ingest_cycles.with_label_values(&[source, "ok"]).inc();
        let base = snapshot.base_currency.as_str();
        for (quote, rate) in snapshot.quotes.iter() {
            if let Some(value) = rate_to_f64(rate) {
                self.stored_rate
                    .with_label_values(&[base, quote.as_str()])
                    .set(value);
            }
        }
    }

    /// Render all metrics in the Prometheus text format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    match metrics.encode() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
