//! Error taxonomy for ingestion, conversation and delivery.
//!
//! Adapters speak `anyhow`; these enums are what the use cases hand back
//! so callers can map each failure to the right outcome (abort a cycle,
//! answer 500, answer 403, or log and carry on).

use rust_decimal::Decimal;
use thiserror::Error;

/// Invalid quote data (bad code, non-positive rate, duplicate key).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error("invalid currency code {0:?}")]
    InvalidCode(String),

    #[error("rate for {code} must be positive, got {rate}")]
    NonPositive { code: String, rate: Decimal },

    #[error("duplicate quote for {0}")]
    Duplicate(String),
}

/// The scraped source data is unusable or unreachable.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("scraper failed: {0:#}")]
    Source(anyhow::Error),

    #[error("scraped {names} names but {rates} rates")]
    ColumnMismatch { names: usize, rates: usize },

    #[error("invalid raw rate {raw:?} for {name}")]
    InvalidRate { name: String, raw: String },
}

/// Failure of one ingest cycle. No repository write happens for any variant
/// except `Store`, which can only occur during the write phase itself.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("currency {name:?} missing from scraped data")]
    UnknownCurrency { name: String },

    #[error("history entry {key} already exists for {base}")]
    DuplicateSnapshot { base: String, key: String },

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error("rate store failure: {0:#}")]
    Store(anyhow::Error),
}

/// The conversation could not be answered.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("no rate data stored for {base}")]
    NoData { base: String },

    #[error("rate store failure: {0:#}")]
    Store(anyhow::Error),
}

/// Webhook subscription handshake mismatch.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("webhook verification failed")]
pub struct VerificationFailure;

/// The notification sink did not accept a message.
#[derive(Debug, Error)]
pub enum ForwardingError {
    #[error("send rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("send failed after {attempts} attempts: {last_error}")]
    Unreachable { attempts: u32, last_error: String },

    #[error("failed to build send request: {0}")]
    Request(String),
}
