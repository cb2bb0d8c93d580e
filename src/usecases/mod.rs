//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the bot's workflows. Each use case is a self-contained
//! business operation.
//!
//! Use cases:
//! - `RateIngestor`: One scrape → normalize → store cycle
//! - `IngestScheduler`: Periodic, non-overlapping ingest of every source
//! - `WebhookDispatcher`: Answer a batch of chat events and forward replies
//! - `SubscriptionRequest`: Webhook verification handshake

pub mod delivery;
pub mod ingest;
pub mod scheduler;
pub mod subscription;

pub use delivery::{DeliveryReport, WebhookDispatcher};
pub use ingest::RateIngestor;
pub use scheduler::{CycleReport, IngestScheduler, IngestSource};
pub use subscription::SubscriptionRequest;
