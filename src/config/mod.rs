//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml`; secrets come
//! from the environment (see `secrets`). Source profiles, endpoints and
//! the deployment's base currency are externalized here, nothing is
//! hardcoded in the domain layer.

pub mod loader;
pub mod secrets;

use std::num::NonZeroU32;
use std::time::Duration;

use serde::Deserialize;

use crate::adapters::messenger::MessengerClientConfig;
use crate::domain::conversation::DEFAULT_PROMPT;
use crate::domain::rates::CurrencyCode;
use crate::domain::source::{CurrencyAlias, RateConvention, SourceProfile};

pub use secrets::Secrets;

/// Top-level bot configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the bot begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bot identity and conversation settings.
  pub bot: BotConfig,
  /// Webhook server.
  #[serde(default)]
  pub server: ServerConfig,
  /// Rate store backend.
  #[serde(default)]
  pub store: StoreConfig,
  /// Send API client.
  #[serde(default)]
  pub messenger: MessengerConfig,
  /// Scheduled ingest.
  #[serde(default)]
  pub ingest: IngestConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Base currency every chat answer is quoted against.
  pub base_currency: CurrencyCode,
  /// Menu prompt override.
  pub prompt: Option<String>,
}

impl BotConfig {
  pub fn prompt(&self) -> &str {
    self.prompt.as_deref().unwrap_or(DEFAULT_PROMPT)
  }
}

/// Webhook server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Webhook server bind address.
  #[serde(default = "default_server_addr")]
  pub bind_address: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind_address: default_server_addr(),
    }
  }
}

/// Which tree store backs the repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
  /// In-process only; lost on restart.
  Memory,
  /// Single JSON file under `data_dir`.
  #[default]
  File,
  /// Firebase Realtime Database REST API.
  Firebase,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  #[serde(default)]
  pub backend: StoreBackend,
  /// Directory of the file store.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Firebase database URL, required for the firebase backend.
  pub database_url: Option<String>,
  /// Request timeout for remote stores (seconds).
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      backend: StoreBackend::default(),
      data_dir: default_data_dir(),
      database_url: None,
      timeout_seconds: default_timeout(),
    }
  }
}

/// Send API client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MessengerConfig {
  /// Graph API base URL including version.
  #[serde(default = "default_graph_url")]
  pub graph_url: String,
  /// Request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
  /// Maximum retries on transient send errors.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base backoff delay (milliseconds).
  #[serde(default = "default_retry_delay")]
  pub retry_base_delay_ms: u64,
  /// Outbound send throttle.
  #[serde(default = "default_sends_per_second")]
  pub sends_per_second: u32,
}

impl Default for MessengerConfig {
  fn default() -> Self {
    Self {
      graph_url: default_graph_url(),
      timeout_seconds: default_timeout(),
      max_retries: default_max_retries(),
      retry_base_delay_ms: default_retry_delay(),
      sends_per_second: default_sends_per_second(),
    }
  }
}

impl MessengerConfig {
  /// Client settings; a zero send rate falls back to one per second.
  pub fn client_config(&self) -> MessengerClientConfig {
    MessengerClientConfig {
      graph_url: self.graph_url.clone(),
      timeout: Duration::from_secs(self.timeout_seconds),
      sends_per_second: NonZeroU32::new(self.sends_per_second).unwrap_or(NonZeroU32::MIN),
      max_retries: self.max_retries,
      retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
    }
  }
}

/// Scheduled ingest configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
  /// Run the scheduler in this process.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Seconds between ingest passes.
  #[serde(default = "default_ingest_interval")]
  pub interval_seconds: u64,
  /// Scrape request timeout (seconds).
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
  /// Sources, ingested in order every pass.
  #[serde(default)]
  pub sources: Vec<SourceConfig>,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      interval_seconds: default_ingest_interval(),
      timeout_seconds: default_timeout(),
      sources: Vec::new(),
    }
  }
}

/// One scraped source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
  /// Source name, used in logs and metric labels.
  pub name: String,
  pub base_currency: CurrencyCode,
  /// Endpoint serving the scraped `{names, rates}` table.
  pub url: String,
  pub convention: RateConvention,
  /// Long-form name → code table.
  pub currencies: Vec<CurrencyAlias>,
}

impl SourceConfig {
  pub fn profile(&self) -> SourceProfile {
    SourceProfile {
      name: self.name.clone(),
      base_currency: self.base_currency.clone(),
      convention: self.convention,
      currencies: self.currencies.clone(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_server_addr() -> String {
  "0.0.0.0:5000".to_string()
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_timeout() -> u64 {
  10
}

fn default_graph_url() -> String {
  "https://graph.facebook.com/v2.6".to_string()
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_delay() -> u64 {
  200
}

fn default_sends_per_second() -> u32 {
  20
}

fn default_ingest_interval() -> u64 {
  600
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}
