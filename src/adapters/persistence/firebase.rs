//! Firebase Realtime Database Store - REST Adapter
//!
//! Reads and writes subtrees through the database REST API:
//! `GET/PUT {database_url}/{path}.json?auth={token}`. A `null` body
//! means nothing is stored at the path.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::ports::store::TreeStore;

/// Firebase Realtime Database client.
pub struct FirebaseStore {
    /// Underlying HTTP client.
    http: Client,
    /// Database root, e.g. `https://my-app.firebaseio.com`.
    database_url: String,
    /// Database secret or ID token, sent as `auth`.
    auth_token: Option<String>,
}

impl FirebaseStore {
    /// Create a new store client.
    pub fn new(database_url: &str, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            database_url: database_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    /// REST URL of a store path.
    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path.trim_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }
}

#[async_trait]
impl TreeStore for FirebaseStore {
    #[instrument(skip(self))]
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        let response = self
            .authorize(self.http.get(self.url(path)))
            .send()
            .await
            .with_context(|| format!("Failed to read {path} from Firebase"))?
            .error_for_status()
            .with_context(|| format!("Firebase rejected read of {path}"))?;

        let value: Value = response
            .json()
            .await
            .context("Failed to parse Firebase response")?;

        debug!(found = !value.is_null(), "Firebase read");
        Ok((!value.is_null()).then_some(value))
    }

    #[instrument(skip(self, value))]
    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.authorize(self.http.put(self.url(path)))
            .json(&value)
            .send()
            .await
            .with_context(|| format!("Failed to write {path} to Firebase"))?
            .error_for_status()
            .with_context(|| format!("Firebase rejected write of {path}"))?;
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        // Shallow read of the root only lists keys, so it stays cheap.
        let request = self
            .authorize(self.http.get(self.url("")))
            .query(&[("shallow", "true")]);
        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Firebase health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_path() {
        let store =
            FirebaseStore::new("https://fx.firebaseio.com/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(store.url("rates/SGD"), "https://fx.firebaseio.com/rates/SGD.json");
        assert_eq!(store.url("/history/SGD/"), "https://fx.firebaseio.com/history/SGD.json");
    }
}
