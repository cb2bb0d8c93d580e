//! Notification Sink Port - Outbound Chat Messages
//!
//! The only thing the bot does with a reply is hand it to the sink,
//! addressed by the sender id it came from.

use async_trait::async_trait;

use crate::domain::conversation::OutboundMessage;
use crate::domain::errors::ForwardingError;

/// Trait for outbound message transports.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
  /// Deliver `message` to `recipient_id`.
  async fn send(
    &self,
    recipient_id: &str,
    message: &OutboundMessage,
  ) -> Result<(), ForwardingError>;
}
