//! Callbox server library logic.
//!
//! Receives telephony webhooks, verifies their signatures, answers the call
//! with a record-a-message script and forwards each finished recording to the
//! outbound queue.

pub mod api_call;
pub mod config;
pub mod twiml;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Extension, Json, Router,
};
use callbox_auth::SignatureVerifier;
use callbox_queue::PublisherHandle;
use config::{Config, WebhookConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Webhook paths, public URL and greeting.
    pub webhook: WebhookConfig,
    /// Verifier holding the public URL and auth token.
    pub verifier: SignatureVerifier,
    /// Producer side of the outbound queue.
    pub publisher: PublisherHandle,
}

impl AppState {
    pub fn new(config: &Config, publisher: PublisherHandle) -> Self {
        Self {
            webhook: config.webhook.clone(),
            verifier: SignatureVerifier::new(
                config.webhook.public_url.clone(),
                config.webhook.auth_token.clone(),
            ),
            publisher,
        }
    }
}

/// Maximum request body size (64 KiB). Webhook forms are a few hundred bytes.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
///
/// Webhook routes accept every method so that the handlers, not the router,
/// decide how a non-POST request is rejected.
pub fn app(state: AppState) -> Router {
    let start_path = state.webhook.start_path.clone();
    let done_path = state.webhook.done_path.clone();

    Router::new()
        .route("/health", get(health))
        .route(&start_path, any(api_call::start_handler))
        .route(&done_path, any(api_call::done_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
