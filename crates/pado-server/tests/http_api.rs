//! End-to-end tests for the Pado HTTP API.
//!
//! The router runs in-process over in-memory repositories, an in-memory
//! secret backend and an in-memory revocation cache.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use pado_core::repository::{MemoryCredentialRepository, MemoryUserRepository};
use pado_core::revocation::MemoryRevocationBackend;
use pado_core::token::TokenConfig;
use pado_storage::{MemoryBackend, SecretStoreClient};

use pado_server::routes::build_router;
use pado_server::state::AppState;

const SECRET: &str = "integration-test-secret-with-32-bytes!!";

struct TestApp {
    router: Router,
    backend: MemoryBackend,
}

fn app_with(secret_store: SecretStoreClient, backend: MemoryBackend) -> TestApp {
    let token_config = TokenConfig {
        secret: SECRET.to_owned(),
        access_ttl: chrono::Duration::minutes(15),
        refresh_ttl: chrono::Duration::days(7),
    };
    let state = AppState::new(
        &token_config,
        Arc::new(MemoryUserRepository::new()),
        Arc::new(MemoryCredentialRepository::new()),
        Arc::new(MemoryRevocationBackend::new()),
        secret_store,
        "secret/pado",
    );
    TestApp {
        router: build_router(Arc::new(state), &["*".to_owned()]),
        backend,
    }
}

fn app() -> TestApp {
    let backend = MemoryBackend::new();
    let client = SecretStoreClient::new(Arc::new(backend.clone()));
    app_with(client, backend)
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Sign up and return `(id, access_token, refresh_token)`.
    async fn signup(&self, name: &str, email: &str) -> (i64, String, String) {
        let (status, body) = self
            .send(
                "POST",
                "/signup",
                None,
                Some(json!({ "name": name, "email": email, "password": "Aa1!aaaa" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "signup failed: {body}");
        (
            body["id"].as_i64().unwrap(),
            body["accessToken"].as_str().unwrap().to_owned(),
            body["refreshToken"].as_str().unwrap().to_owned(),
        )
    }

    async fn create_credential(&self, token: &str, name: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/credentials",
            Some(token),
            Some(json!({
                "name": name,
                "type": "AWS",
                "description": "deploy key",
                "data": "secret"
            })),
        )
        .await
    }
}

// ── Sessions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn signup_returns_id_and_token_pair() {
    let app = app();
    let (status, body) = app
        .send(
            "POST",
            "/signup",
            None,
            Some(json!({ "name": "alice1", "email": "a@x.com", "password": "Aa1!aaaa" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["message"], "signup completed");
    assert!(body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn signup_rejects_duplicate_email_and_bad_input() {
    let app = app();
    app.signup("alice1", "a@x.com").await;

    let (status, body) = app
        .send(
            "POST",
            "/signup",
            None,
            Some(json!({ "name": "bob22", "email": "a@x.com", "password": "Aa1!aaaa" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "U002");

    let (status, body) = app
        .send(
            "POST",
            "/signup",
            None,
            Some(json!({ "name": "bob22", "email": "b@x.com", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "C002");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/signin")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signin_checks_password() {
    let app = app();
    app.signup("alice1", "a@x.com").await;

    let (status, body) = app
        .send(
            "POST",
            "/signin",
            None,
            Some(json!({ "userName": "alice1", "password": "Aa1!aaaa" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].is_string());
    assert!(body["refreshToken"].is_string());

    let (status, body) = app
        .send(
            "POST",
            "/signin",
            None,
            Some(json!({ "userName": "alice1", "password": "Bb2@bbbb" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "U003");
    assert_eq!(body["status"], 401);

    let (status, body) = app
        .send(
            "POST",
            "/signin",
            None,
            Some(json!({ "userName": "nobody1", "password": "Aa1!aaaa" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "U003");
}

#[tokio::test]
async fn protected_routes_need_an_access_token() {
    let app = app();
    let (_, _, refresh) = app.signup("alice1", "a@x.com").await;

    let (status, body) = app.send("GET", "/credentials", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "C003");

    let (status, _) = app.send("GET", "/credentials", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send("GET", "/credentials", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signout_revokes_own_refresh_token() {
    let app = app();
    let (_, access, refresh) = app.signup("alice1", "a@x.com").await;

    let (status, body) = app
        .send(
            "POST",
            "/signout",
            Some(&access),
            Some(json!({ "refreshToken": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "signed out");

    // Already revoked: still a success.
    let (status, _) = app
        .send(
            "POST",
            "/signout",
            Some(&access),
            Some(json!({ "refreshToken": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signout_rejects_access_token_and_foreign_refresh_token() {
    let app = app();
    let (_, alice_access, _) = app.signup("alice1", "a@x.com").await;
    let (_, _, bob_refresh) = app.signup("bobby2", "b@x.com").await;

    let (status, body) = app
        .send(
            "POST",
            "/signout",
            Some(&alice_access),
            Some(json!({ "refreshToken": alice_access })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "C002");

    let (status, body) = app
        .send(
            "POST",
            "/signout",
            Some(&alice_access),
            Some(json!({ "refreshToken": bob_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "C004");

    let (status, _) = app
        .send(
            "POST",
            "/signout",
            None,
            Some(json!({ "refreshToken": bob_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Credentials ──────────────────────────────────────────────────────

#[tokio::test]
async fn credential_lifecycle() {
    let app = app();
    let (user_id, access, _) = app.signup("alice1", "a@x.com").await;

    let (status, created) = app.create_credential(&access, "k1").await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["name"], "k1");
    assert_eq!(created["type"], "AWS");
    assert_eq!(created["message"], "credential registered");
    assert!(created.get("data").is_none());
    let id = created["credentialId"].as_i64().unwrap();
    assert_eq!(app.backend.len().await, 1);

    let (status, listed) = app.send("GET", "/credentials", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["credentialId"], id);
    assert!(listed[0].get("data").is_none());
    assert!(listed[0].get("message").is_none());

    let uri = format!("/credentials/{id}");
    let (status, detail) = app.send("GET", &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["data"], "secret");
    assert_eq!(detail["description"], "deploy key");
    assert!(detail["createdAt"].is_string());
    assert!(detail["updatedAt"].is_string());

    let (status, body) = app.send("DELETE", &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "credential deleted");
    assert!(app.backend.is_empty().await);

    let (status, body) = app.send("GET", &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "C005");

    assert_eq!(user_id, 1);
}

#[tokio::test]
async fn duplicate_credential_name_conflicts() {
    let app = app();
    let (_, access, _) = app.signup("alice1", "a@x.com").await;

    let (status, _) = app.create_credential(&access, "k1").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.create_credential(&access, "k1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CR003");
    assert_eq!(app.backend.len().await, 1);
}

#[tokio::test]
async fn credentials_are_owner_scoped() {
    let app = app();
    let (_, alice, _) = app.signup("alice1", "a@x.com").await;
    let (_, bob, _) = app.signup("bobby2", "b@x.com").await;

    let (_, created) = app.create_credential(&alice, "k1").await;
    let uri = format!("/credentials/{}", created["credentialId"]);

    let (status, body) = app.send("GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "C004");
    assert!(body.get("data").is_none());

    let (status, _) = app.send("DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = app.send("GET", "/credentials", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));

    // Still there for the owner.
    let (status, _) = app.send("GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn non_numeric_credential_id_is_a_bad_request() {
    let app = app();
    let (_, access, _) = app.signup("alice1", "a@x.com").await;

    let (status, body) = app
        .send("GET", "/credentials/abc", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "C002");
}

#[tokio::test]
async fn secret_store_outage_leaves_no_orphan_row() {
    let app = app();
    let (_, access, _) = app.signup("alice1", "a@x.com").await;
    app.backend.set_failing(true);

    let (status, body) = app.create_credential(&access, "k1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "upstream");

    app.backend.set_failing(false);
    let (status, listed) = app.send("GET", "/credentials", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn disabled_secret_store_reports_unavailable() {
    let app = app_with(SecretStoreClient::disabled(), MemoryBackend::new());
    let (_, access, _) = app.signup("alice1", "a@x.com").await;

    let (status, body) = app.create_credential(&access, "k1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "V004");

    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["secret_store"], "disabled");
}

// ── System ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public_and_sets_security_headers() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["secret_store"], "available");
}
