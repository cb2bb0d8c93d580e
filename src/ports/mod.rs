//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `TreeStore`: Raw hierarchical JSON persistence
//! - `RateRepository`: Typed current-rate and history access
//! - `RateScraper`: Source page extraction
//! - `NotificationSink`: Outbound chat messages

pub mod notifier;
pub mod repository;
pub mod scraper;
pub mod store;
