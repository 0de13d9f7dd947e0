//! System routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Response for `GET /health`.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `available`, `unavailable` or `disabled`.
    pub secret_store: &'static str,
}

/// Build the system router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// `GET /health`
///
/// The process is up whenever this answers; the secret store status is
/// informational.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let secret_store = if !state.secret_store.is_enabled() {
        "disabled"
    } else if state.secret_store.is_available().await {
        "available"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "ok",
        secret_store,
    })
}
