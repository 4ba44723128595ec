//! HTTP transport for the relay: maps RPC calls onto axum routes.
//!
//! ## Routes (relative to the node's service path)
//!
//! - `POST {path}/RegistrationService.Register`: body `SubscribeArg`, reply `bool`.
//! - `POST {path}/PushService.PushEvent`: body `ClientArg`, reply `bool`.
//! - `GET {path}/health`: `{ "ok": true, "topics": [...] }`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::warn;

use super::push::PushEndpoint;
use super::registration::RegistrationService;
use super::error::NodeError;
use super::wire::{route, validate_path, ClientArg, SubscribeArg, PUSH_METHOD, REGISTER_METHOD};

/// Services shared by the route handlers.
#[derive(Clone)]
pub struct RelayState {
    pub registration: Arc<RegistrationService>,
    pub push: Arc<PushEndpoint>,
}

/// Build an axum `Router` exposing both services under `path`.
///
/// `path` must already be normalized (see [`normalize_path`](super::normalize_path)).
/// Paths the router would read as parameters are refused with `InvalidPath`.
pub fn router(path: &str, state: RelayState) -> Result<Router, NodeError> {
    validate_path(path).map_err(|reason| NodeError::InvalidPath {
        path: path.to_string(),
        reason,
    })?;
    Ok(Router::new()
        .route(&route(path, "health"), get(health_handler))
        .route(&route(path, REGISTER_METHOD), post(register_handler))
        .route(&route(path, PUSH_METHOD), post(push_handler))
        .with_state(state))
}

/// `GET {path}/health`.
async fn health_handler(State(state): State<RelayState>) -> impl IntoResponse {
    let topics = state.push.bus().topics();
    Json(json!({ "ok": true, "topics": topics }))
}

/// `POST {path}/RegistrationService.Register`.
async fn register_handler(
    State(state): State<RelayState>,
    Json(arg): Json<SubscribeArg>,
) -> impl IntoResponse {
    Json(state.registration.register(arg))
}

/// `POST {path}/PushService.PushEvent`.
///
/// Re-publication runs synchronous handlers, which may block, so it goes to
/// the blocking pool rather than an async worker.
async fn push_handler(
    State(state): State<RelayState>,
    Json(arg): Json<ClientArg>,
) -> impl IntoResponse {
    let push = Arc::clone(&state.push);
    match tokio::task::spawn_blocking(move || push.push_event(arg)).await {
        Ok(delivered) => (StatusCode::OK, Json(delivered)),
        Err(e) => {
            warn!(error = %e, "push handler task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(false))
        }
    }
}
