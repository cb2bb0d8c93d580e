//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{AppConfig, StoreBackend};

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "FXBOT_CONFIG";

/// Upper bound on Send API retries.
pub const MAX_SEND_RETRIES: u32 = 10;

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Config path from `FXBOT_CONFIG`, else `config.toml`.
pub fn config_path() -> String {
  std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    base_currency = %config.bot.base_currency,
    store = ?config.store.backend,
    sources = config.ingest.sources.len(),
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(!config.bot.name.is_empty(), "bot.name must not be empty");
  anyhow::ensure!(
    !config.server.bind_address.is_empty(),
    "server.bind_address must not be empty"
  );

  // Store validation
  if config.store.backend == StoreBackend::Firebase {
    anyhow::ensure!(
      config
        .store
        .database_url
        .as_deref()
        .is_some_and(|url| !url.is_empty()),
      "store.database_url is required for the firebase backend"
    );
  }
  anyhow::ensure!(
    config.store.timeout_seconds > 0,
    "store.timeout_seconds must be positive"
  );

  // Messenger validation
  anyhow::ensure!(
    !config.messenger.graph_url.is_empty(),
    "messenger.graph_url must not be empty"
  );
  anyhow::ensure!(
    config.messenger.max_retries <= MAX_SEND_RETRIES,
    "messenger.max_retries must be at most {}, got {}",
    MAX_SEND_RETRIES,
    config.messenger.max_retries
  );
  anyhow::ensure!(
    config.messenger.sends_per_second > 0,
    "messenger.sends_per_second must be positive"
  );

  // Ingest validation
  anyhow::ensure!(
    config.ingest.interval_seconds > 0,
    "ingest.interval_seconds must be positive"
  );

  let mut names = HashSet::new();
  for (i, source) in config.ingest.sources.iter().enumerate() {
    anyhow::ensure!(!source.name.is_empty(), "Source {} has empty name", i);
    anyhow::ensure!(
      names.insert(source.name.as_str()),
      "Source {} ({}) is configured twice",
      i,
      source.name
    );
    anyhow::ensure!(
      !source.url.is_empty(),
      "Source {} ({}) has empty url",
      i,
      source.name
    );
    anyhow::ensure!(
      !source.currencies.is_empty(),
      "Source {} ({}) maps no currencies",
      i,
      source.name
    );

    let mut codes = HashSet::new();
    for alias in &source.currencies {
      anyhow::ensure!(
        codes.insert(alias.code.as_str()),
        "Source {} ({}) maps {} twice",
        i,
        source.name,
        alias.code
      );
    }
  }

  Ok(())
}
