//! Quick-reply conversation engine.
//!
//! Stateless: every inbound event is answered from the event itself plus
//! the current quotes for the deployment's base currency. The previous
//! menu's choice arrives as the quick-reply payload, so no session is kept.
//!
//! ```text
//! FreeformMessage ──────────────► AwaitingCurrencySelection (menu)
//! QuickReply(code in quotes) ───► AnsweringRate (one rate + menu)
//! QuickReply("All") ────────────► AnsweringRate (every rate + menu)
//! QuickReply(anything else) ────► Ignore (no message)
//! ```

use serde::{Deserialize, Serialize};

use super::errors::ConversationError;
use super::rates::{CurrencyCode, Quotes};

/// Payload and label of the "every currency" menu option.
pub const ALL_OPTION: &str = "All";

/// Prompt shown with the currency menu.
pub const DEFAULT_PROMPT: &str = "Hi, which currency rate would you like to know?";

/// What the user sent, reduced to what the engine cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    FreeformMessage,
    QuickReplySelection(String),
}

/// One inbound chat event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEvent {
    /// Opaque page-scoped sender identifier.
    pub sender_id: String,
    pub kind: EventKind,
}

impl ConversationEvent {
    pub fn freeform(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            kind: EventKind::FreeformMessage,
        }
    }

    pub fn quick_reply(sender_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            kind: EventKind::QuickReplySelection(payload.into()),
        }
    }
}

/// A selectable quick-reply option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOption {
    pub label: String,
    pub payload: String,
}

/// Message to hand to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    pub options: Vec<ReplyOption>,
}

impl OutboundMessage {
    pub fn option_payloads(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.payload.as_str()).collect()
    }
}

/// State transition chosen for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Show the currency menu.
    AwaitCurrencySelection,
    /// Answer a single rate.
    AnswerRate(CurrencyCode),
    /// Answer every rate.
    AnswerAllRates,
    /// Unrecognized payload; nothing is sent.
    Ignore,
}

impl Transition {
    /// Pick the transition for `kind` given the available quotes.
    pub fn classify(kind: &EventKind, quotes: &Quotes) -> Self {
        match kind {
            EventKind::FreeformMessage => Self::AwaitCurrencySelection,
            EventKind::QuickReplySelection(payload) if payload == ALL_OPTION => {
                Self::AnswerAllRates
            }
            EventKind::QuickReplySelection(payload) => quotes
                .codes()
                .find(|code| code.as_str() == payload)
                .map_or(Self::Ignore, |code| Self::AnswerRate(code.clone())),
        }
    }
}

/// Renders replies for a single base currency.
#[derive(Debug, Clone)]
pub struct ConversationEngine {
    base_currency: CurrencyCode,
    prompt: String,
}

impl ConversationEngine {
    pub fn new(base_currency: CurrencyCode) -> Self {
        Self {
            base_currency,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Override the menu prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base_currency
    }

    /// Answer one event.
    ///
    /// `quotes` is `current[base]`; `None` means nothing was ever ingested
    /// for the base and fails with `NoData`. `Ok(None)` is the explicit
    /// no-op for unrecognized quick-reply payloads.
    pub fn respond(
        &self,
        event: &ConversationEvent,
        quotes: Option<&Quotes>,
    ) -> Result<Option<OutboundMessage>, ConversationError> {
        let quotes = quotes.ok_or_else(|| ConversationError::NoData {
            base: self.base_currency.to_string(),
        })?;

        let text = match Transition::classify(&event.kind, quotes) {
            Transition::AwaitCurrencySelection => self.prompt.clone(),
            Transition::AnswerRate(code) => match quotes.get(code.as_str()) {
                Some(rate) => self.rate_line(&code, rate),
                None => return Ok(None),
            },
            Transition::AnswerAllRates => quotes
                .iter()
                .map(|(code, rate)| self.rate_line(code, rate))
                .collect::<Vec<_>>()
                .join("\n"),
            Transition::Ignore => return Ok(None),
        };

        Ok(Some(OutboundMessage {
            text,
            options: Self::menu(quotes),
        }))
    }

    /// Every quote currency in snapshot order, then "All".
    pub fn menu(quotes: &Quotes) -> Vec<ReplyOption> {
        quotes
            .codes()
            .map(|code| ReplyOption {
                label: code.to_string(),
                payload: code.to_string(),
            })
            .chain(std::iter::once(ReplyOption {
                label: ALL_OPTION.to_string(),
                payload: ALL_OPTION.to_string(),
            }))
            .collect()
    }

    fn rate_line(&self, code: &CurrencyCode, rate: rust_decimal::Decimal) -> String {
        format!("1 {} is to {} {}", self.base_currency, rate.normalize(), code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sgd_quotes() -> Quotes {
        let mut quotes = Quotes::new();
        quotes.insert(CurrencyCode::parse("USD").unwrap(), dec!(1.35)).unwrap();
        quotes.insert(CurrencyCode::parse("AUD").unwrap(), dec!(2.05)).unwrap();
        quotes
    }

    fn engine() -> ConversationEngine {
        ConversationEngine::new(CurrencyCode::parse("SGD").unwrap())
    }

    #[test]
    fn test_freeform_gets_menu() {
        let quotes = sgd_quotes();
        let reply = engine()
            .respond(&ConversationEvent::freeform("42"), Some(&quotes))
            .unwrap()
            .unwrap();
        assert_eq!(reply.text, DEFAULT_PROMPT);
        assert_eq!(reply.option_payloads(), vec!["USD", "AUD", "All"]);
    }

    #[test]
    fn test_single_rate_answer() {
        let quotes = sgd_quotes();
        let reply = engine()
            .respond(&ConversationEvent::quick_reply("42", "USD"), Some(&quotes))
            .unwrap()
            .unwrap();
        assert_eq!(reply.text, "1 SGD is to 1.35 USD");
        assert_eq!(reply.option_payloads(), vec!["USD", "AUD", "All"]);
    }

    #[test]
    fn test_all_rates_listing() {
        let quotes = sgd_quotes();
        let reply = engine()
            .respond(&ConversationEvent::quick_reply("42", "All"), Some(&quotes))
            .unwrap()
            .unwrap();
        assert_eq!(reply.text, "1 SGD is to 1.35 USD\n1 SGD is to 2.05 AUD");
    }

    #[test]
    fn test_unknown_payload_is_noop() {
        let quotes = sgd_quotes();
        let engine = engine();
        for payload in ["JPY", "usd", "", "ALL"] {
            let reply = engine
                .respond(&ConversationEvent::quick_reply("42", payload), Some(&quotes))
                .unwrap();
            assert!(reply.is_none(), "payload {payload:?} should be ignored");
        }
    }

    #[test]
    fn test_missing_snapshot_is_no_data() {
        let err = engine()
            .respond(&ConversationEvent::freeform("42"), None)
            .unwrap_err();
        assert!(matches!(err, ConversationError::NoData { base } if base == "SGD"));
    }

    #[test]
    fn test_custom_prompt() {
        let quotes = sgd_quotes();
        let reply = engine()
            .with_prompt("Pick one")
            .respond(&ConversationEvent::freeform("1"), Some(&quotes))
            .unwrap()
            .unwrap();
        assert_eq!(reply.text, "Pick one");
    }
}
