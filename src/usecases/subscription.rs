//! Webhook Subscription Handshake
//!
//! The chat platform confirms a webhook by sending `hub.mode=subscribe`,
//! the shared verify token, and a challenge the endpoint must echo back.

use crate::domain::errors::VerificationFailure;

/// The only mode the handshake accepts.
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Query parameters of a verification request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionRequest<'a> {
  pub mode: Option<&'a str>,
  pub verify_token: Option<&'a str>,
  pub challenge: Option<&'a str>,
}

impl SubscriptionRequest<'_> {
  /// Return the challenge to echo if the request matches `expected_token`.
  ///
  /// Exact string comparison; a missing parameter always fails.
  pub fn verify(&self, expected_token: &str) -> Result<String, VerificationFailure> {
    match (self.mode, self.verify_token, self.challenge) {
      (Some(SUBSCRIBE_MODE), Some(token), Some(challenge)) if token == expected_token => {
        Ok(challenge.to_string())
      }
      _ => Err(VerificationFailure),
    }
  }
}
