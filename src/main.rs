//! FX Messenger Bot — Entry Point
//!
//! Initializes configuration, logging, the rate store and the Send API
//! client, then serves the webhook and runs scheduled ingest until
//! SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (or `$FXBOT_CONFIG`) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load secrets from env vars (WEBHOOK_TOKEN, PAGE_ACCESS_TOKEN, ...)
//! 4. Build the tree store backend and the rate repository
//! 5. Create MessengerClient (HTTP + retry + send throttle)
//! 6. Create WebhookDispatcher over the conversation engine
//! 7. Spawn the webhook server (/, /webhook, /live, /ready)
//! 8. Spawn the metrics server (/metrics)
//! 9. Spawn the ingest scheduler
//! 10. Wait for SIGINT → broadcast shutdown → drain tasks

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use fx_messenger_bot::adapters::http::{WebhookServer, WebhookState};
use fx_messenger_bot::adapters::messenger::{MessengerClient, PayloadVerifier};
use fx_messenger_bot::adapters::metrics::MetricsRegistry;
use fx_messenger_bot::adapters::persistence::{
  FileStore, FirebaseStore, MemoryStore, TreeRateRepository,
};
use fx_messenger_bot::adapters::scraper::JsonTableScraper;
use fx_messenger_bot::config::{self, AppConfig, Secrets, StoreBackend};
use fx_messenger_bot::domain::conversation::ConversationEngine;
use fx_messenger_bot::ports::repository::RateRepository;
use fx_messenger_bot::ports::store::TreeStore;
use fx_messenger_bot::usecases::{IngestScheduler, IngestSource, WebhookDispatcher};

#[tokio::main]
async fn main() -> Result<()> {
  // ── 1. Load configuration ───────────────────────────────
  let config_path = config::loader::config_path();
  let config = config::loader::load_config(&config_path)
    .context("Failed to load configuration")?;

  // ── 2. Initialize structured JSON logging ───────────────
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level)),
    )
    .json()
    .init();

  info!(
    name = %config.bot.name,
    version = env!("CARGO_PKG_VERSION"),
    base_currency = %config.bot.base_currency,
    store = ?config.store.backend,
    sources = config.ingest.sources.len(),
    "Starting FX Messenger Bot"
  );

  // ── 3. Secrets ──────────────────────────────────────────
  let secrets = Secrets::from_env().context("Failed to load secrets from env")?;

  let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

  // ── 4. Store backend + repository ───────────────────────
  let store = build_store(&config, &secrets).await?;
  let repository: Arc<dyn RateRepository> = Arc::new(TreeRateRepository::new(store));
  if !repository.is_healthy().await {
    warn!("Rate store is not reachable yet, /ready will report 503");
  }

  let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);

  // ── 5. Send API client ──────────────────────────────────
  let client = Arc::new(
    MessengerClient::new(
      secrets.page_access_token.clone(),
      config.messenger.client_config(),
    )
    .context("Failed to create Messenger client")?,
  );

  // ── 6. Conversation engine + dispatcher ─────────────────
  let engine =
    ConversationEngine::new(config.bot.base_currency.clone()).with_prompt(config.bot.prompt());
  let dispatcher = WebhookDispatcher::new(engine, Arc::clone(&repository), client)
    .with_metrics(Arc::clone(&metrics));

  // ── 7. Webhook server ───────────────────────────────────
  let server = WebhookServer::new(WebhookState {
    dispatcher,
    verify_token: secrets.webhook_token.clone(),
    verifier: secrets.app_secret.as_deref().map(PayloadVerifier::new),
    metrics: Some(Arc::clone(&metrics)),
  });
  let server_shutdown = shutdown_tx.subscribe();
  let bind_address = config.server.bind_address.clone();
  let server_handle = tokio::spawn(async move {
    if let Err(e) = server.run(&bind_address, server_shutdown).await {
      error!(error = %e, "Webhook server failed");
    }
  });

  // ── 8. Metrics server ───────────────────────────────────
  let metrics_handle = if config.metrics.enabled {
    let metrics_shutdown = shutdown_tx.subscribe();
    let bind_address = config.metrics.bind_address.clone();
    let registry = Arc::clone(&metrics);
    Some(tokio::spawn(async move {
      if let Err(e) = registry.serve(bind_address, metrics_shutdown).await {
        error!(error = %e, "Metrics server failed");
      }
    }))
  } else {
    None
  };

  // ── 9. Ingest scheduler ─────────────────────────────────
  let scheduler_handle = if config.ingest.enabled && !config.ingest.sources.is_empty() {
    let sources = build_sources(&config)?;
    let scheduler = IngestScheduler::new(
      Arc::clone(&repository),
      sources,
      Duration::from_secs(config.ingest.interval_seconds),
    )
    .with_metrics(Arc::clone(&metrics));
    Some(tokio::spawn(scheduler.run(shutdown_tx.subscribe())))
  } else {
    info!("Scheduled ingest disabled");
    None
  };

  info!("All tasks spawned — bot is running");

  // ── 10. Wait for SIGINT ─────────────────────────────────
  signal::ctrl_c()
    .await
    .context("Failed to listen for shutdown signal")?;
  info!("SIGINT received, initiating graceful shutdown");

  let _ = shutdown_tx.send(());

  // An in-flight ingest cycle finishes its writes before the scheduler stops.
  if let Some(handle) = scheduler_handle {
    let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
  }
  let _ = tokio::time::timeout(Duration::from_secs(10), server_handle).await;
  if let Some(handle) = metrics_handle {
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
  }

  info!("Shutdown complete");
  Ok(())
}

/// Build the configured tree store.
async fn build_store(config: &AppConfig, secrets: &Secrets) -> Result<Arc<dyn TreeStore>> {
  let timeout = Duration::from_secs(config.store.timeout_seconds);
  let store: Arc<dyn TreeStore> = match config.store.backend {
    StoreBackend::Memory => {
      warn!("Using in-memory store, rates are lost on restart");
      Arc::new(MemoryStore::new())
    }
    StoreBackend::File => Arc::new(
      FileStore::new(&config.store.data_dir)
        .await
        .context("Failed to open file store")?,
    ),
    StoreBackend::Firebase => {
      let url = config
        .store
        .database_url
        .as_deref()
        .context("store.database_url not set")?;
      Arc::new(
        FirebaseStore::new(url, secrets.firebase_auth_token.clone(), timeout)
          .context("Failed to create Firebase client")?,
      )
    }
  };
  Ok(store)
}

/// One scraper per configured source.
fn build_sources(config: &AppConfig) -> Result<Vec<IngestSource>> {
  let timeout = Duration::from_secs(config.ingest.timeout_seconds);
  config
    .ingest
    .sources
    .iter()
    .map(|source| {
      let scraper = JsonTableScraper::new(source.url.clone(), timeout)
        .with_context(|| format!("Failed to create scraper for {}", source.name))?;
      Ok(IngestSource {
        profile: source.profile(),
        scraper: Arc::new(scraper),
      })
    })
    .collect()
}
