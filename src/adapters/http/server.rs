//! Webhook Server - Messenger Endpoint and Health Checks
//!
//! Routes:
//! - `GET /`: HTML greeting with the current time
//! - `GET /webhook`: subscription handshake
//! - `POST /webhook`: message delivery
//! - `GET /live`, `GET /ready`: orchestrator health checks
//!
//! Each request runs in its own task; the only shared state is the
//! dispatcher (and through it the repository and sink).

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Local;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::messenger::signature::{PayloadVerifier, SIGNATURE_HEADER};
use crate::adapters::messenger::types::{WebhookPayload, PAGE_OBJECT};
use crate::adapters::metrics::MetricsRegistry;
use crate::usecases::delivery::WebhookDispatcher;
use crate::usecases::subscription::SubscriptionRequest;

/// Body of a rejected handshake.
pub const VERIFICATION_FAILED: &str = "Failed validation. Make sure the validation tokens match.";

/// Shared state of the webhook routes.
pub struct WebhookState {
  /// Answers deliveries.
  pub dispatcher: WebhookDispatcher,
  /// Expected `hub.verify_token`.
  pub verify_token: String,
  /// Checks `X-Hub-Signature-256` when an app secret is configured.
  pub verifier: Option<PayloadVerifier>,
  pub metrics: Option<Arc<MetricsRegistry>>,
}

/// Axum-based webhook server.
pub struct WebhookServer {
  state: Arc<WebhookState>,
}

#[derive(Debug, Default, Deserialize)]
struct HandshakeParams {
  #[serde(rename = "hub.mode")]
  mode: Option<String>,
  #[serde(rename = "hub.verify_token")]
  verify_token: Option<String>,
  #[serde(rename = "hub.challenge")]
  challenge: Option<String>,
}

impl WebhookServer {
  /// Create a new server over `state`.
  pub fn new(state: WebhookState) -> Self {
    Self {
      state: Arc::new(state),
    }
  }

  /// Build the router.
  pub fn router(&self) -> Router {
    Router::new()
      .route("/", get(Self::index))
      .route("/webhook", get(Self::verify).post(Self::receive))
      .route("/live", get(Self::liveness))
      .route("/ready", get(Self::readiness))
      .with_state(Arc::clone(&self.state))
  }

  /// Bind `bind_address` and serve until shutdown.
  pub async fn run(
    self,
    bind_address: &str,
    shutdown_rx: broadcast::Receiver<()>,
  ) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    self.serve(listener, shutdown_rx).await
  }

  /// Serve on an already bound listener until shutdown.
  #[instrument(skip_all)]
  pub async fn serve(
    self,
    listener: TcpListener,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) -> anyhow::Result<()> {
    info!(address = %listener.local_addr()?, "Webhook server started");

    axum::serve(listener, self.router())
      .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
      })
      .await?;

    Ok(())
  }

  async fn index() -> Html<String> {
    let now = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f");
    Html(format!(
      "<h1>Hello from the rate bot</h1>\n<p>It is currently {now}.</p>\n"
    ))
  }

  /// Subscription handshake: echo the challenge or answer 403.
  async fn verify(
    State(state): State<Arc<WebhookState>>,
    Query(params): Query<HandshakeParams>,
  ) -> Response {
    let request = SubscriptionRequest {
      mode: params.mode.as_deref(),
      verify_token: params.verify_token.as_deref(),
      challenge: params.challenge.as_deref(),
    };
    match request.verify(&state.verify_token) {
      Ok(challenge) => {
        info!("Webhook subscription verified");
        (StatusCode::OK, challenge).into_response()
      }
      Err(_) => {
        warn!(mode = ?params.mode, "Webhook verification rejected");
        (StatusCode::FORBIDDEN, VERIFICATION_FAILED).into_response()
      }
    }
  }

  /// Message delivery.
  async fn receive(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
  ) -> Response {
    let started = Instant::now();
    let (status, text) = Self::handle_delivery(&state, &headers, &body).await;
    if let Some(metrics) = &state.metrics {
      metrics
        .delivery_latency_ms
        .with_label_values(&[status.as_str()])
        .observe(started.elapsed().as_secs_f64() * 1000.0);
    }
    (status, text).into_response()
  }

  #[instrument(skip_all, fields(bytes = body.len()))]
  async fn handle_delivery(
    state: &WebhookState,
    headers: &HeaderMap,
    body: &[u8],
  ) -> (StatusCode, String) {
    if let Some(verifier) = &state.verifier {
      let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
      if !verifier.verify(body, signature) {
        warn!("Delivery signature mismatch");
        return (StatusCode::FORBIDDEN, "Invalid signature".to_string());
      }
    }

    let value: Value = match serde_json::from_slice(body) {
      Ok(value) => value,
      Err(e) => {
        warn!(error = %e, "Delivery body is not JSON");
        return (StatusCode::BAD_REQUEST, "Invalid JSON".to_string());
      }
    };

    if value.get("object").and_then(Value::as_str) != Some(PAGE_OBJECT) {
      debug!(object = ?value.get("object"), "Ignoring non-page delivery");
      return (StatusCode::OK, "OK".to_string());
    }

    let payload: WebhookPayload = match serde_json::from_value(value) {
      Ok(payload) => payload,
      Err(e) => {
        warn!(error = %e, "Malformed page delivery");
        return (StatusCode::BAD_REQUEST, "Malformed delivery".to_string());
      }
    };

    let events = payload.conversation_events();
    let skipped = payload.raw_event_count() - events.len();
    if skipped > 0 {
      debug!(skipped, "Skipped echo and non-message events");
      if let Some(metrics) = &state.metrics {
        metrics
          .webhook_events
          .with_label_values(&["skipped"])
          .inc_by(skipped as u64);
      }
    }

    match state.dispatcher.dispatch(&events).await {
      Ok(report) => {
        debug!(?report, "Delivery processed");
        (StatusCode::OK, "OK".to_string())
      }
      Err(e) => {
        error!(error = %e, "Delivery failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    }
  }

  /// Liveness check: always 200 while the process runs.
  async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
  }

  /// Readiness check: 200 only if the rate store answers.
  async fn readiness(State(state): State<Arc<WebhookState>>) -> impl IntoResponse {
    if state.dispatcher.repository_healthy().await {
      (StatusCode::OK, "READY")
    } else {
      (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
  }
}
