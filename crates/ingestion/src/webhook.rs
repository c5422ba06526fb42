//! Inbound webhook endpoint.
//!
//! One status endpoint keyed by the per-installation webhook id. Malformed or
//! unknown-device requests get a client-error status and cause no side
//! effects.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tracing::{debug, warn};

use contracts::{ContractError, StatusReport};

use crate::StatusIngest;

#[derive(Clone)]
struct WebhookState {
    ingest: Arc<StatusIngest>,
    webhook_id: Arc<str>,
}

/// Build the webhook router.
///
/// Mounts `POST /webhook/{webhook_id}`; requests with any other webhook id
/// are rejected with 404.
pub fn webhook_router(ingest: Arc<StatusIngest>, webhook_id: &str) -> Router {
    let state = WebhookState {
        ingest,
        webhook_id: Arc::from(webhook_id),
    };
    Router::new()
        .route("/webhook/{webhook_id}", post(handle_status_webhook))
        .with_state(state)
}

async fn handle_status_webhook(
    State(state): State<WebhookState>,
    Path(webhook_id): Path<String>,
    body: Result<Json<StatusReport>, JsonRejection>,
) -> Response {
    if webhook_id != *state.webhook_id {
        debug!(webhook_id = %webhook_id, "unknown webhook id");
        return StatusCode::NOT_FOUND.into_response();
    }

    let Json(report) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection, "malformed status payload");
            return (StatusCode::BAD_REQUEST, rejection.to_string()).into_response();
        }
    };

    match state.ingest.receive_status(report) {
        // Stale reports are acknowledged like applied ones; the push
        // transport is fire-and-forget on the tablet side
        Ok(_) => Json(json!({"status": "ok"})).into_response(),
        Err(e @ ContractError::UnknownDevice { .. }) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e @ ContractError::MalformedPayload { .. }) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            warn!(error = %e, "status ingest failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
