//! Admin API - the external adapter over the coordinator.
//!
//! Thin pass-throughs: service commands go straight to the dispatcher via
//! the coordinator, reads come from the unified device view.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use contracts::{CommandTransport, ContractError};
use coordinator::Coordinator;

/// Build the admin API router.
pub fn admin_router<T>(coordinator: Arc<Coordinator<T>>) -> Router
where
    T: CommandTransport + Send + Sync + 'static,
{
    Router::new()
        .route("/api/devices", get(list_devices::<T>))
        .route("/api/devices/{device_id}", get(device_view::<T>))
        .route("/api/devices/{device_id}/next_image", post(next_image::<T>))
        .route(
            "/api/devices/{device_id}/refresh_config",
            post(refresh_config::<T>),
        )
        .route("/api/devices/{device_id}/profile", post(set_profile::<T>))
        .with_state(coordinator)
}

#[derive(Debug, Deserialize)]
struct SetProfileBody {
    profile: String,
}

async fn list_devices<T>(State(coordinator): State<Arc<Coordinator<T>>>) -> Response
where
    T: CommandTransport + Send + Sync + 'static,
{
    Json(coordinator.fleet_views()).into_response()
}

async fn device_view<T>(
    State(coordinator): State<Arc<Coordinator<T>>>,
    Path(device_id): Path<String>,
) -> Response
where
    T: CommandTransport + Send + Sync + 'static,
{
    match coordinator.device_view(&device_id) {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

async fn next_image<T>(
    State(coordinator): State<Arc<Coordinator<T>>>,
    Path(device_id): Path<String>,
) -> Response
where
    T: CommandTransport + Send + Sync + 'static,
{
    match coordinator.next_image(&device_id).await {
        Ok(()) => ok_response(),
        Err(e) => error_response(e),
    }
}

async fn refresh_config<T>(
    State(coordinator): State<Arc<Coordinator<T>>>,
    Path(device_id): Path<String>,
) -> Response
where
    T: CommandTransport + Send + Sync + 'static,
{
    match coordinator.refresh_config(&device_id).await {
        Ok(()) => ok_response(),
        Err(e) => error_response(e),
    }
}

async fn set_profile<T>(
    State(coordinator): State<Arc<Coordinator<T>>>,
    Path(device_id): Path<String>,
    Json(body): Json<SetProfileBody>,
) -> Response
where
    T: CommandTransport + Send + Sync + 'static,
{
    match coordinator.set_profile(&device_id, &body.profile) {
        Ok(()) => ok_response(),
        Err(e) => error_response(e),
    }
}

fn ok_response() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

fn error_response(error: ContractError) -> Response {
    let status = match &error {
        ContractError::UnknownDevice { .. } => StatusCode::NOT_FOUND,
        ContractError::UnknownProfile { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ContractError::Busy { .. } => StatusCode::CONFLICT,
        ContractError::Unreachable { .. } | ContractError::Timeout { .. } => {
            StatusCode::BAD_GATEWAY
        }
        ContractError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": error.to_string()}))).into_response()
}
