//! Authentication middleware for Pado.
//!
//! Resolves the `Authorization: Bearer` header through the gate and stores
//! the resulting [`Identity`] in the request extensions. The middleware never
//! rejects: routes that need a caller take the [`Authenticated`] extractor,
//! which answers 401 when no identity was attached.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use pado_core::gate::is_public_path;
use pado_core::models::Identity;

use crate::error::AppError;
use crate::state::AppState;

/// Middleware that attaches the caller's identity, if any.
///
/// Skips the gate for public endpoints.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Some(identity) = state.gate.authenticate(header.as_deref()).await {
        req.extensions_mut().insert(identity);
    }
    next.run(req).await
}

/// Extractor for routes that require an authenticated caller.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))
    }
}
