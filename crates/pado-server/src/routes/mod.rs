//! HTTP route handlers for Pado.
//!
//! Routes are organized by subsystem:
//! - `auth`: signup, signin, signout
//! - `credentials`: credential registration, listing, retrieval, deletion
//! - `sys`: health

pub mod auth;
pub mod credentials;
pub mod sys;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, Method, header};
use axum::middleware as axum_mw;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::AppError;
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Unwrap a JSON body, turning a rejection into a validation error.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(inner)| inner)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors_allowed_origins: &[String]) -> Router {
    Router::new()
        .merge(sys::router())
        .merge(auth::router())
        .merge(credentials::router())
        .layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_allowed_origins))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
