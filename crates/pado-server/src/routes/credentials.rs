//! Credential routes.
//!
//! Metadata responses never carry the payload; only
//! `GET /credentials/{id}` returns it, and only to the owner.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use pado_core::credential::NewCredentialRequest;
use pado_core::models::Credential;

use crate::error::AppError;
use crate::middleware::Authenticated;
use crate::routes::auth::MessageResponse;
use crate::routes::json_body;
use crate::state::AppState;

/// Request body for `POST /credentials`.
#[derive(Deserialize)]
pub struct CreateCredentialRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub credential_type: String,
    #[serde(default)]
    pub data: String,
}

/// Credential metadata as returned by create and list.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialResponse {
    pub credential_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub created_at: String,
}

impl CredentialResponse {
    fn from_credential(credential: Credential, message: Option<&'static str>) -> Self {
        Self {
            credential_id: credential.id,
            name: credential.name,
            credential_type: credential.credential_type,
            description: credential.description,
            message,
            created_at: iso(credential.created_at),
        }
    }
}

/// Credential metadata with its payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDetailResponse {
    pub credential_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub description: String,
    pub data: String,
    pub created_at: String,
    pub updated_at: String,
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn credential_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::BadRequest(format!("invalid credential id: {}", e.body_text())))
}

/// Build the credentials router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/credentials", get(list_credentials).post(create_credential))
        .route(
            "/credentials/{id}",
            get(get_credential).delete(delete_credential),
        )
}

/// `POST /credentials`
async fn create_credential(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    body: Result<Json<CreateCredentialRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CredentialResponse>), AppError> {
    let body = json_body(body)?;
    let credential = state
        .credentials
        .create(
            &identity,
            NewCredentialRequest {
                name: body.name,
                credential_type: body.credential_type,
                description: body.description,
                data: body.data,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CredentialResponse::from_credential(
            credential,
            Some("credential registered"),
        )),
    ))
}

/// `GET /credentials`
async fn list_credentials(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
) -> Result<Json<Vec<CredentialResponse>>, AppError> {
    let credentials = state.credentials.list(&identity).await?;
    Ok(Json(
        credentials
            .into_iter()
            .map(|c| CredentialResponse::from_credential(c, None))
            .collect(),
    ))
}

/// `GET /credentials/{id}`
async fn get_credential(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<CredentialDetailResponse>, AppError> {
    let id = credential_id(path)?;
    let detail = state.credentials.get(&identity, id).await?;
    let credential = detail.credential;

    Ok(Json(CredentialDetailResponse {
        credential_id: credential.id,
        name: credential.name,
        credential_type: credential.credential_type,
        description: credential.description,
        data: detail.data,
        created_at: iso(credential.created_at),
        updated_at: iso(credential.updated_at),
    }))
}

/// `DELETE /credentials/{id}`
async fn delete_credential(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = credential_id(path)?;
    state.credentials.delete(&identity, id).await?;
    Ok(Json(MessageResponse {
        message: "credential deleted",
    }))
}
