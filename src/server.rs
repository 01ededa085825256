//! HTTP ingress.
//!
//! The webhook always answers `200` with a JSON `{"message": ...}` body,
//! whatever happened inside, so LINE never redelivers a batch. `OPTIONS`
//! pre-flight requests are answered by the CORS layer.

use crate::line::{handle_webhook, AppState, EventOutcome, WebhookBody};
use crate::security::{verify_signature, SIGNATURE_HEADER};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, Method},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: String,
}

impl WebhookResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub primary_quota_exhausted: bool,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(SIGNATURE_HEADER)]);

    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        primary_quota_exhausted: state.orchestrator.provider_state().is_tripped(),
    })
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookResponse> {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        error!("Webhook request without signature");
        return WebhookResponse::new("Signature is missing");
    };

    if !verify_signature(&state.channel_secret, &body, signature) {
        error!("Webhook signature mismatch");
        return WebhookResponse::new("Invalid signature");
    }

    let payload: WebhookBody = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Malformed webhook body: {}", e);
            return WebhookResponse::new("Invalid body");
        }
    };

    if payload.events.is_empty() {
        info!("Webhook without events");
        return WebhookResponse::new("No events found");
    }

    let outcomes = handle_webhook(&state, payload).await;
    let failed = outcomes
        .iter()
        .filter(|outcome| **outcome == EventOutcome::Failed)
        .count();
    info!(
        "Processed {} events ({} failed)",
        outcomes.len(),
        failed
    );

    WebhookResponse::new("OK")
}
