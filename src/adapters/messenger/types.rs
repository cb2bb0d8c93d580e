//! Messenger Platform Request/Response Types
//!
//! Serialization types for the inbound webhook delivery and the
//! outbound Send API. Inbound types are lenient: every field the bot
//! does not need is optional so unrelated event types still parse.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{ConversationEvent, OutboundMessage};

/// `object` value of page subscriptions.
pub const PAGE_OBJECT: &str = "page";

/// Top-level webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
  /// Subscription object type ("page" for Messenger).
  pub object: String,
  /// Batched entries, one per page.
  #[serde(default)]
  pub entry: Vec<WebhookEntry>,
}

/// One page entry inside a delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
  /// Page ID.
  pub id: Option<String>,
  /// Messaging events for this page.
  #[serde(default)]
  pub messaging: Vec<MessagingEvent>,
}

/// A single messaging event (message, delivery receipt, read, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingEvent {
  /// Page-scoped ID of the user.
  pub sender: Participant,
  /// Page receiving the event.
  pub recipient: Option<Participant>,
  /// Present only for message events.
  pub message: Option<InboundMessage>,
}

/// Sender or recipient reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
  pub id: String,
}

/// Message body of a messaging event.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
  /// Message ID.
  pub mid: Option<String>,
  /// Free text, if any.
  pub text: Option<String>,
  /// Quick reply the user tapped, if any.
  pub quick_reply: Option<QuickReplyPayload>,
  /// Set when the page itself sent this message.
  #[serde(default)]
  pub is_echo: bool,
}

/// Payload of a tapped quick reply.
#[derive(Debug, Clone, Deserialize)]
pub struct QuickReplyPayload {
  pub payload: String,
}

impl WebhookPayload {
  /// Whether this delivery is for a page subscription.
  pub fn is_page(&self) -> bool {
    self.object == PAGE_OBJECT
  }

  /// Every user message in the delivery, in order.
  ///
  /// Skips non-message events (receipts, reads) and echoes of the
  /// page's own messages.
  pub fn conversation_events(&self) -> Vec<ConversationEvent> {
    self
      .entry
      .iter()
      .flat_map(|entry| &entry.messaging)
      .filter_map(|event| {
        let message = event.message.as_ref().filter(|m| !m.is_echo)?;
        let sender = event.sender.id.clone();
        Some(match &message.quick_reply {
          Some(reply) => ConversationEvent::quick_reply(sender, reply.payload.clone()),
          None => ConversationEvent::freeform(sender),
        })
      })
      .collect()
  }

  /// Number of raw messaging events, including skipped ones.
  pub fn raw_event_count(&self) -> usize {
    self.entry.iter().map(|e| e.messaging.len()).sum()
  }
}

/// Send API request body.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
  pub recipient: Participant,
  pub message: SendMessage,
}

/// Message part of a Send API request.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
  pub text: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub quick_replies: Vec<QuickReplyButton>,
}

/// Quick reply button in a Send API request.
#[derive(Debug, Clone, Serialize)]
pub struct QuickReplyButton {
  /// Always "text" for currency buttons.
  pub content_type: String,
  pub title: String,
  pub payload: String,
}

impl SendRequest {
  /// Build a Send API request from an outbound message.
  pub fn new(recipient_id: &str, message: &OutboundMessage) -> Self {
    Self {
      recipient: Participant {
        id: recipient_id.to_string(),
      },
      message: SendMessage {
        text: message.text.clone(),
        quick_replies: message
          .options
          .iter()
          .map(|option| QuickReplyButton {
            content_type: "text".to_string(),
            title: option.label.clone(),
            payload: option.payload.clone(),
          })
          .collect(),
      },
    }
  }
}

/// Send API success response.
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
  pub recipient_id: Option<String>,
  pub message_id: Option<String>,
}
