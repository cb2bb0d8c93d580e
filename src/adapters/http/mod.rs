//! Inbound HTTP Adapter
//!
//! The public webhook endpoint plus liveness/readiness checks.

pub mod server;

pub use server::{WebhookServer, WebhookState};
