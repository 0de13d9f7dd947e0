//! Session routes: signup, signin and signout.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::Authenticated;
use crate::routes::json_body;
use crate::state::AppState;

/// Request body for `POST /signup`.
#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

/// Response for `POST /signup`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub id: i64,
    pub message: &'static str,
    pub access_token: String,
    pub refresh_token: String,
}

/// Request body for `POST /signin`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub password: String,
}

/// Token pair response for `POST /signin`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Request body for `POST /signout`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignoutRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Plain message response.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Build the session router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
}

/// `POST /signup`
async fn signup(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<SignupResponse>, AppError> {
    let body = json_body(body)?;
    let outcome = state
        .auth
        .signup(&body.name, &body.email, &body.password)
        .await?;

    Ok(Json(SignupResponse {
        id: outcome.user_id,
        message: "signup completed",
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
    }))
}

/// `POST /signin`
async fn signin(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let body = json_body(body)?;
    let tokens = state.auth.signin(&body.user_name, &body.password).await?;

    Ok(Json(TokenResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// `POST /signout`
///
/// Ends the caller's session. Succeeds even when recording the revocation
/// fails.
async fn signout(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    body: Result<Json<SignoutRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let body = json_body(body)?;
    state.auth.signout(&identity, &body.refresh_token).await?;

    Ok(Json(MessageResponse {
        message: "signed out",
    }))
}
