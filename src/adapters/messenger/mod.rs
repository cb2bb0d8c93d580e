//! Messenger Platform Adapter
//!
//! Everything specific to the Messenger webhook and Send API.
//!
//! Sub-modules:
//! - `client`: Send API client implementing `NotificationSink`
//! - `signature`: `X-Hub-Signature-256` payload verification
//! - `types`: Webhook and Send API request/response types

pub mod client;
pub mod signature;
pub mod types;

pub use client::{MessengerClient, MessengerClientConfig};
pub use signature::PayloadVerifier;
pub use types::WebhookPayload;
