//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, the webhook server, JSON tree
//! stores). Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `http`: Inbound webhook endpoint and health checks
//! - `messenger`: Messenger Send API client, webhook types, signatures
//! - `metrics`: Prometheus metrics export
//! - `persistence`: Memory, file and Firebase tree stores
//! - `scraper`: Rate table scrapers

pub mod http;
pub mod messenger;
pub mod metrics;
pub mod persistence;
pub mod scraper;
