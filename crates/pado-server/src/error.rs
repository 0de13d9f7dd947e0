//! HTTP error types for the Pado server.
//!
//! Maps domain errors from `pado-core` into HTTP responses. Every error
//! produces the same JSON body: a category in `error`, a stable short `code`,
//! a human-readable `message`, the numeric `status` and an RFC 3339
//! `timestamp`. Internal failures are logged in full and answered with a
//! generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::error;

use pado_core::error::{AuthError, CredentialError, RepositoryError, VaultError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or missing input.
    BadRequest(String),
    /// Missing or invalid bearer identity.
    Unauthorized(String),
    /// Bad user name or password.
    InvalidCredentials,
    /// Wrong owner or foreign session.
    Forbidden(String),
    /// Credential row absent.
    NotFound(String),
    /// Secret payload absent for an existing row.
    SecretNotFound(String),
    /// Duplicate email or login name.
    UserExists(String),
    /// Duplicate credential name for this user.
    CredentialExists(String),
    /// The secret store failed the operation.
    SecretStoreFailed(String),
    /// No secret store is configured.
    SecretStoreUnavailable,
    /// Anything else. The detail is logged, never returned.
    Internal(String),
}

impl AppError {
    /// HTTP status, category and stable code.
    #[must_use]
    pub const fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation", "C002"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "authentication", "C003"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "authentication", "U003"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "authorization", "C004"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", "C005"),
            Self::SecretNotFound(_) => (StatusCode::NOT_FOUND, "not_found", "V005"),
            Self::UserExists(_) => (StatusCode::CONFLICT, "conflict", "U002"),
            Self::CredentialExists(_) => (StatusCode::CONFLICT, "conflict", "CR003"),
            Self::SecretStoreFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream", "V001"),
            Self::SecretStoreUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream", "V004")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", "C001"),
        }
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    code: &'static str,
    message: String,
    status: u16,
    timestamp: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, category, code) = self.classify();
        let message = match self {
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::SecretNotFound(msg)
            | Self::UserExists(msg)
            | Self::CredentialExists(msg) => msg,
            Self::InvalidCredentials => "invalid user name or password".to_owned(),
            Self::SecretStoreFailed(detail) => {
                error!(code, error = %detail, "secret store operation failed");
                "secret store operation failed".to_owned()
            }
            Self::SecretStoreUnavailable => {
                error!(code, "secret store is not configured");
                "secret store is not configured".to_owned()
            }
            Self::Internal(detail) => {
                error!(code, error = %detail, "internal error");
                "internal server error".to_owned()
            }
        };

        let body = ErrorBody {
            error: category,
            code,
            message,
            status: status.as_u16(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation { .. } => Self::UserExists(err.to_string()),
            RepositoryError::Backend { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::InvalidInput { .. } => Self::BadRequest(err.to_string()),
            VaultError::NotFound { .. } => Self::SecretNotFound(err.to_string()),
            VaultError::Unavailable => Self::SecretStoreUnavailable,
            VaultError::OperationFailed(_) => Self::SecretStoreFailed(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidRequest { .. } => Self::BadRequest(err.to_string()),
            AuthError::AlreadyRegistered { .. } => Self::UserExists(err.to_string()),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            AuthError::Hashing { .. } | AuthError::Token(_) => Self::Internal(err.to_string()),
            AuthError::Repository(inner) => Self::from(inner),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidRequest { .. } => Self::BadRequest(err.to_string()),
            CredentialError::AlreadyExists { .. } => Self::CredentialExists(err.to_string()),
            CredentialError::NotFound { .. } => Self::NotFound(err.to_string()),
            CredentialError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            CredentialError::Vault(inner) => Self::from(inner),
            CredentialError::Repository(RepositoryError::UniqueViolation { .. }) => {
                Self::CredentialExists(err.to_string())
            }
            CredentialError::Repository(inner) => Self::Internal(inner.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn body_carries_category_code_and_status() {
        let (status, body) = render(AppError::CredentialExists("dup".to_owned())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
        assert_eq!(body["code"], "CR003");
        assert_eq!(body["message"], "dup");
        assert_eq!(body["status"], 409);
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn internal_detail_is_hidden() {
        let (status, body) = render(AppError::Internal("pool timed out".to_owned())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "C001");
        assert_eq!(body["message"], "internal server error");
    }

    #[test]
    fn domain_errors_map_to_stable_codes() {
        let cases: Vec<(AppError, &str)> = vec![
            (AuthError::InvalidCredentials.into(), "U003"),
            (AuthError::AlreadyRegistered { field: "email" }.into(), "U002"),
            (
                AuthError::Forbidden {
                    reason: "x".to_owned(),
                }
                .into(),
                "C004",
            ),
            (CredentialError::NotFound { id: 1 }.into(), "C005"),
            (
                CredentialError::Vault(VaultError::NotFound { credential_id: 1 }).into(),
                "V005",
            ),
            (
                CredentialError::Vault(VaultError::Unavailable).into(),
                "V004",
            ),
            (
                CredentialError::Repository(RepositoryError::UniqueViolation {
                    constraint: "credentials_user_id_name_key".to_owned(),
                })
                .into(),
                "CR003",
            ),
            (
                CredentialError::Repository(RepositoryError::Backend {
                    reason: "down".to_owned(),
                })
                .into(),
                "C001",
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.classify().2, code, "{err:?}");
        }
    }
}
