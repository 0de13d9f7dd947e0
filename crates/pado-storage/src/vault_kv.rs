//! HashiCorp Vault compatible KV backend.
//!
//! Talks to the KV (version 1) HTTP API: records live at `/v1/<path>`,
//! authentication is the `X-Vault-Token` header, and reads return the record
//! under a top-level `data` object. Each path segment is percent-encoded so
//! free-form credential types cannot escape their directory.
//!
//! Feature-gated behind `vault-backend`. No retries: a transient failure is
//! surfaced to the caller immediately.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::{SecretBackend, SecretData, SecretStoreError};

/// Request timeout for every call to the secret store.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A secret backend speaking the Vault KV v1 HTTP API.
#[derive(Clone)]
pub struct VaultKvBackend {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for VaultKvBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKvBackend")
            .field("base_url", &self.base_url)
            .field("token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

/// Read response envelope. Only `data` matters to us.
#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    data: Option<serde_json::Map<String, serde_json::Value>>,
}

impl VaultKvBackend {
    /// Build a backend for the store at `base_url` using `token`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::Init`] if the token is empty or the HTTP
    /// client cannot be constructed.
    pub fn new(base_url: &str, token: &str) -> Result<Self, SecretStoreError> {
        if token.trim().is_empty() {
            return Err(SecretStoreError::Init {
                reason: "missing secret store token".to_owned(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("pado-storage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SecretStoreError::Init {
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/v1/{}", self.base_url, encoded.join("/"))
    }
}

#[async_trait::async_trait]
impl SecretBackend for VaultKvBackend {
    async fn write(&self, path: &str, data: &SecretData) -> Result<(), SecretStoreError> {
        let write_err = |reason: String| SecretStoreError::Write {
            path: crate::mask_path(path),
            reason,
        };

        let resp = self
            .client
            .post(self.url(path))
            .header("X-Vault-Token", &self.token)
            .json(data)
            .send()
            .await
            .map_err(|e| write_err(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(write_err(format!("HTTP {}", status.as_u16())))
        }
    }

    async fn read(&self, path: &str) -> Result<Option<SecretData>, SecretStoreError> {
        let read_err = |reason: String| SecretStoreError::Read {
            path: crate::mask_path(path),
            reason,
        };

        let resp = self
            .client
            .get(self.url(path))
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .map_err(|e| read_err(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(read_err(format!("HTTP {}", status.as_u16())));
        }

        let body: ReadResponse = resp
            .json()
            .await
            .map_err(|e| read_err(format!("invalid response body: {e}")))?;

        Ok(body.data.map(|fields| {
            fields
                .into_iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                })
                .collect()
        }))
    }

    async fn delete(&self, path: &str) -> Result<(), SecretStoreError> {
        let delete_err = |reason: String| SecretStoreError::Delete {
            path: crate::mask_path(path),
            reason,
        };

        let resp = self
            .client
            .delete(self.url(path))
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .map_err(|e| delete_err(e.to_string()))?;

        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(delete_err(format!("HTTP {}", status.as_u16())))
        }
    }

    async fn health(&self) -> Result<(), SecretStoreError> {
        let resp = self
            .client
            .get(format!("{}/v1/sys/health", self.base_url))
            .send()
            .await
            .map_err(|e| SecretStoreError::Health {
                reason: e.to_string(),
            })?;

        // 429 is a healthy standby node.
        let status = resp.status();
        if status.is_success() || status == StatusCode::TOO_MANY_REQUESTS {
            Ok(())
        } else {
            Err(SecretStoreError::Health {
                reason: format!("HTTP {}", status.as_u16()),
            })
        }
    }
}
