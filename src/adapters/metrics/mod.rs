//! Metrics Adapter
//!
//! Prometheus metrics export on a dedicated bind address via axum 0.7.
//! Health checks live on the webhook server (`adapters::http`).

pub mod prometheus;

pub use prometheus::MetricsRegistry;
