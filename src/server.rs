//! HTTP surface: the relay webhook plus liveness endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::PipelineError;
use crate::pipeline::{WebhookPayload, WebhookProcessor};
use crate::store::ConversationStore;

/// Service name reported by `GET /health`.
pub const SERVICE_NAME: &str = "whatsapp-assist";

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<WebhookProcessor>,
    pub store: Arc<dyn ConversationStore>,
}

impl AppState {
    pub fn new(processor: Arc<WebhookProcessor>, store: Arc<dyn ConversationStore>) -> Self {
        Self { processor, store }
    }
}

/// Build the service router.
pub fn app_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /webhook
///
/// Accepts both relay events and direct test bodies. Bodies that do not
/// match the schema are rejected by the extractor with a 4xx.
async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> Response {
    match state.processor.process(payload).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /
///
/// Reports whether the conversation store answers a ping.
async fn root(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(serde_json::json!({
            "status": "online",
            "database": "connected",
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "Database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "online",
                    "database": "unreachable",
                })),
            )
                .into_response()
        }
    }
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}

/// Reason reported to webhook callers when state cannot be loaded or saved.
pub const PERSISTENCE_FAILURE_REASON: &str = "Conversation state unavailable";

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        error!(error = %self, "Webhook processing failed");
        let reason = match self {
            PipelineError::Persistence(_) => PERSISTENCE_FAILURE_REASON,
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "status": "error",
                "reason": reason,
            })),
        )
            .into_response()
    }
}
