//! Messenger Send API Client - Throttled, Retrying Outbound Sink
//!
//! Wraps reqwest with a send-rate limiter and exponential-backoff
//! retries for delivering replies through the Send API.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use super::types::{SendRequest, SendResponse};
use crate::domain::conversation::OutboundMessage;
use crate::domain::errors::ForwardingError;
use crate::ports::notifier::NotificationSink;

/// Configuration for the Send API client.
#[derive(Debug, Clone)]
pub struct MessengerClientConfig {
  /// Graph API base URL including version.
  pub graph_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum sends per second.
  pub sends_per_second: NonZeroU32,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for MessengerClientConfig {
  fn default() -> Self {
    Self {
      graph_url: "https://graph.facebook.com/v2.6".to_string(),
      timeout: Duration::from_secs(10),
      sends_per_second: NonZeroU32::new(20).unwrap_or(NonZeroU32::MIN),
      max_retries: 3,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

/// Outbound message sink backed by the Messenger Send API.
pub struct MessengerClient {
  /// Underlying HTTP client.
  http: Client,
  /// Page access token, sent as `access_token`.
  access_token: String,
  /// Client configuration.
  config: MessengerClientConfig,
  /// Outbound send throttle.
  limiter: DefaultDirectRateLimiter,
}

impl MessengerClient {
  /// Create a new Send API client.
  pub fn new(access_token: String, config: MessengerClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    let limiter = RateLimiter::direct(Quota::per_second(config.sends_per_second));

    Ok(Self {
      http,
      access_token,
      config,
      limiter,
    })
  }

  /// Delay before retry `attempt` (1-based): base * 2^(attempt-1), saturating.
  fn backoff(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    self.config.retry_base_delay.saturating_mul(factor)
  }

  fn messages_url(&self) -> String {
    format!("{}/me/messages", self.config.graph_url.trim_end_matches('/'))
  }
}

#[async_trait]
impl NotificationSink for MessengerClient {
  /// POST the message, retrying transport errors, 429 and 5xx.
  #[instrument(skip(self, message), fields(options = message.options.len()))]
  async fn send(
    &self,
    recipient_id: &str,
    message: &OutboundMessage,
  ) -> Result<(), ForwardingError> {
    let body = SendRequest::new(recipient_id, message);
    let url = self.messages_url();
    let mut last_error = String::from("no attempt made");

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.backoff(attempt);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying send");
        sleep(delay).await;
      }

      self.limiter.until_ready().await;

      let request = self
        .http
        .post(&url)
        .query(&[("access_token", self.access_token.as_str())])
        .json(&body);

      match request.send().await {
        Ok(response) => match response.status() {
          status if status.is_success() => {
            let sent: Option<SendResponse> = response.json().await.ok();
            debug!(
              message_id = ?sent.and_then(|s| s.message_id),
              "Message sent"
            );
            return Ok(());
          }
          StatusCode::TOO_MANY_REQUESTS => {
            warn!("Rate limited by Send API, backing off");
            last_error = "rate limited".to_string();
          }
          status if status.is_server_error() => {
            warn!(status = %status, "Send API server error, retrying");
            last_error = format!("server error {status}");
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(ForwardingError::Rejected {
              status: status.as_u16(),
              body,
            });
          }
        },
        Err(e) if e.is_builder() => return Err(ForwardingError::Request(e.to_string())),
        Err(e) => {
          warn!(error = %e, attempt, "Send request failed");
          last_error = e.to_string();
        }
      }
    }

    Err(ForwardingError::Unreachable {
      attempts: self.config.max_retries + 1,
      last_error,
    })
  }
}
