//! Domain layer - Rate data and conversation logic.
//!
//! Pure types and functions: quote maps, snapshots, source profiles and
//! the quick-reply state machine. Nothing in here performs I/O
//! (hexagonal architecture inner ring).

pub mod conversation;
pub mod errors;
pub mod rates;
pub mod source;

// Re-export core types for convenience
pub use conversation::{
    ConversationEngine, ConversationEvent, EventKind, OutboundMessage, ReplyOption, Transition,
};
pub use errors::{
    ConversationError, ForwardingError, IngestError, QuoteError, ScrapeError, VerificationFailure,
};
pub use rates::{CurrencyCode, Quotes, RateSnapshot};
pub use source::{CurrencyAlias, RateConvention, SourceProfile};
