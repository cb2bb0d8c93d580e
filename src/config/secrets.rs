//! Runtime Secrets - Loaded from the Environment
//!
//! Tokens never live in `config.toml`. Required: `WEBHOOK_TOKEN`,
//! `PAGE_ACCESS_TOKEN`. Optional: `APP_SECRET` (enables payload
//! signature checks) and `FIREBASE_AUTH_TOKEN`.

use std::fmt;

use anyhow::{Context, Result};

/// Secrets needed at runtime.
#[derive(Clone)]
pub struct Secrets {
  /// Shared `hub.verify_token` for the subscription handshake.
  pub webhook_token: String,
  /// Send API page access token.
  pub page_access_token: String,
  /// App secret for `X-Hub-Signature-256`.
  pub app_secret: Option<String>,
  /// Firebase database secret or ID token.
  pub firebase_auth_token: Option<String>,
}

impl Secrets {
  /// Load secrets from environment variables.
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Load secrets through `lookup`. Empty values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
    Ok(Self {
      webhook_token: get("WEBHOOK_TOKEN").context("WEBHOOK_TOKEN not set")?,
      page_access_token: get("PAGE_ACCESS_TOKEN").context("PAGE_ACCESS_TOKEN not set")?,
      app_secret: get("APP_SECRET"),
      firebase_auth_token: get("FIREBASE_AUTH_TOKEN"),
    })
  }
}

impl fmt::Debug for Secrets {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let redact = |s: &Option<String>| s.as_ref().map(|_| "***");
    f.debug_struct("Secrets")
      .field("webhook_token", &"***")
      .field("page_access_token", &"***")
      .field("app_secret", &redact(&self.app_secret))
      .field("firebase_auth_token", &redact(&self.firebase_auth_token))
      .finish()
  }
}
