//! Webhook Delivery - Answer a Batch of Chat Events
//!
//! A single webhook delivery can carry several messaging events. The
//! base currency is fixed per deployment, so `current[base]` is read
//! once per delivery:
//! - missing snapshot or store failure: the whole delivery fails and
//!   nothing is sent (the HTTP layer answers 500)
//! - forwarding failure: logged and counted, the remaining events are
//!   still answered

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::conversation::{ConversationEngine, ConversationEvent, EventKind};
use crate::domain::errors::ConversationError;
use crate::ports::notifier::NotificationSink;
use crate::ports::repository::RateRepository;

/// Outcome counts of one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
  /// Events examined.
  pub events: usize,
  /// Replies accepted by the sink.
  pub sent: usize,
  /// Events that produced no reply (unrecognized payloads).
  pub ignored: usize,
  /// Replies the sink failed to deliver.
  pub forward_failures: usize,
}

/// Runs inbound events through the conversation engine and forwards replies.
pub struct WebhookDispatcher {
  engine: ConversationEngine,
  repository: Arc<dyn RateRepository>,
  sink: Arc<dyn NotificationSink>,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl WebhookDispatcher {
  /// Create a new dispatcher.
  pub fn new(
    engine: ConversationEngine,
    repository: Arc<dyn RateRepository>,
    sink: Arc<dyn NotificationSink>,
  ) -> Self {
    Self {
      engine,
      repository,
      sink,
      metrics: None,
    }
  }

  /// Attach a metrics registry.
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn engine(&self) -> &ConversationEngine {
    &self.engine
  }

  /// Whether the rate repository is reachable.
  pub async fn repository_healthy(&self) -> bool {
    self.repository.is_healthy().await
  }

  /// Answer every event in order.
  #[instrument(skip(self, events), fields(events = events.len(), base = %self.engine.base_currency()))]
  pub async fn dispatch(
    &self,
    events: &[ConversationEvent],
  ) -> Result<DeliveryReport, ConversationError> {
    let mut report = DeliveryReport {
      events: events.len(),
      ..DeliveryReport::default()
    };
    if events.is_empty() {
      return Ok(report);
    }

    let quotes = self
      .repository
      .current(self.engine.base_currency())
      .await
      .map_err(ConversationError::Store)?;

    // Resolve every reply before sending any, so a missing snapshot
    // aborts the delivery without partial answers.
    let mut replies = Vec::with_capacity(events.len());
    for event in events {
      self.count_event(event);
      replies.push(self.engine.respond(event, quotes.as_ref())?);
    }

    for (event, reply) in events.iter().zip(replies) {
      let Some(message) = reply else {
        debug!(sender = %event.sender_id, "Unrecognized selection, no reply");
        report.ignored += 1;
        continue;
      };

      match self.sink.send(&event.sender_id, &message).await {
        Ok(()) => {
          report.sent += 1;
          self.count_forward("sent");
        }
        Err(e) => {
          warn!(sender = %event.sender_id, error = %e, "Failed to forward reply");
          report.forward_failures += 1;
          self.count_forward("failed");
        }
      }
    }

    Ok(report)
  }

  fn count_event(&self, event: &ConversationEvent) {
    if let Some(metrics) = &self.metrics {
      let kind = match event.kind {
        EventKind::FreeformMessage => "freeform",
        EventKind::QuickReplySelection(_) => "quick_reply",
      };
      metrics.webhook_events.with_label_values(&[kind]).inc();
    }
  }

  fn count_forward(&self, outcome: &str) {
    if let Some(metrics) = &self.metrics {
      metrics.messages_forwarded.with_label_values(&[outcome]).inc();
    }
  }
}
