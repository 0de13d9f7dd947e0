//! Credential vault: the bridge between credential metadata and the secret
//! store.
//!
//! Each credential's payload lives at
//! `<base>/<user_id>/<credential_type>/<credential_id>` as a two-field record
//! holding the payload and its creation timestamp. Inputs are validated
//! before any I/O so a bad id or type never produces a request.

use chrono::{SecondsFormat, Utc};
use pado_storage::{SecretData, SecretStoreClient, mask_path};
use tracing::{debug, info};

use crate::error::VaultError;
use crate::models::Credential;

/// Default root under which credential payloads are stored.
pub const DEFAULT_BASE_PATH: &str = "secret/pado";

/// Record field holding the payload.
pub const PAYLOAD_FIELD: &str = "credentialData";

/// Record field holding the write timestamp (RFC 3339).
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Secret path for a credential.
#[must_use]
pub fn secret_path(base: &str, user_id: i64, credential_type: &str, credential_id: i64) -> String {
    format!(
        "{}/{user_id}/{credential_type}/{credential_id}",
        base.trim_end_matches('/')
    )
}

/// Stores, fetches and deletes credential payloads.
#[derive(Debug, Clone)]
pub struct CredentialVault {
    client: SecretStoreClient,
    base_path: String,
}

impl CredentialVault {
    #[must_use]
    pub fn new(client: SecretStoreClient, base_path: impl Into<String>) -> Self {
        Self {
            client,
            base_path: base_path.into(),
        }
    }

    /// Whether the underlying secret store answers its health probe.
    pub async fn is_available(&self) -> bool {
        self.client.is_available().await
    }

    /// Store `payload` for `credential`, owned by `user_id`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidInput`] for a bad id, owner, type or empty payload
    /// - [`VaultError::Unavailable`] when no secret store is configured
    /// - [`VaultError::OperationFailed`] when the store rejects the write
    pub async fn store(
        &self,
        user_id: i64,
        credential: &Credential,
        payload: &str,
    ) -> Result<(), VaultError> {
        let path = self.path_for(user_id, credential)?;
        if payload.trim().is_empty() {
            return Err(VaultError::InvalidInput {
                reason: "credential payload is empty".to_owned(),
            });
        }

        let mut record = SecretData::new();
        record.insert(PAYLOAD_FIELD.to_owned(), payload.to_owned());
        record.insert(
            CREATED_AT_FIELD.to_owned(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );

        self.client.write(&path, &record).await?;
        info!(
            user_id,
            credential_id = credential.id,
            path = %mask_path(&path),
            "credential payload stored"
        );
        Ok(())
    }

    /// Fetch the payload for `credential`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidInput`] for a bad id, owner or type
    /// - [`VaultError::NotFound`] when nothing is stored at the path
    /// - [`VaultError::Unavailable`] or [`VaultError::OperationFailed`] on
    ///   store failures
    pub async fn fetch(&self, user_id: i64, credential: &Credential) -> Result<String, VaultError> {
        let path = self.path_for(user_id, credential)?;
        let mut record = self.client.read(&path).await?.ok_or(VaultError::NotFound {
            credential_id: credential.id,
        })?;

        let payload = record
            .remove(PAYLOAD_FIELD)
            .ok_or(VaultError::NotFound {
                credential_id: credential.id,
            })?;
        debug!(credential_id = credential.id, "credential payload fetched");
        Ok(payload)
    }

    /// Delete the payload for `credential`. A missing record is not an error.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidInput`] for a bad id, owner or type
    /// - [`VaultError::Unavailable`] or [`VaultError::OperationFailed`] on
    ///   store failures
    pub async fn delete(&self, user_id: i64, credential: &Credential) -> Result<(), VaultError> {
        let path = self.path_for(user_id, credential)?;
        self.client.delete(&path).await?;
        info!(
            user_id,
            credential_id = credential.id,
            path = %mask_path(&path),
            "credential payload deleted"
        );
        Ok(())
    }

    fn path_for(&self, user_id: i64, credential: &Credential) -> Result<String, VaultError> {
        let invalid = |reason: &str| VaultError::InvalidInput {
            reason: reason.to_owned(),
        };

        if user_id <= 0 {
            return Err(invalid("user id must be positive"));
        }
        if credential.id <= 0 {
            return Err(invalid("credential id must be positive"));
        }
        if credential.user_id != user_id {
            return Err(invalid("credential is not owned by the given user"));
        }
        let credential_type = credential.credential_type.trim();
        if credential_type.is_empty() {
            return Err(invalid("credential type is empty"));
        }
        if credential_type.contains('/') {
            return Err(invalid("credential type must not contain '/'"));
        }

        Ok(secret_path(
            &self.base_path,
            user_id,
            credential_type,
            credential.id,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pado_storage::{MemoryBackend, SecretBackend};

    use super::*;

    fn credential(id: i64, user_id: i64, credential_type: &str) -> Credential {
        let now = Utc::now();
        Credential {
            id,
            user_id,
            name: "k1".to_owned(),
            credential_type: credential_type.to_owned(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn vault() -> (CredentialVault, MemoryBackend) {
        let backend = MemoryBackend::new();
        let client = SecretStoreClient::new(Arc::new(backend.clone()));
        (CredentialVault::new(client, DEFAULT_BASE_PATH), backend)
    }

    #[test]
    fn path_layout() {
        assert_eq!(secret_path("secret/pado", 7, "AWS", 12), "secret/pado/7/AWS/12");
        assert_eq!(secret_path("kv/", 1, "GCP", 2), "kv/1/GCP/2");
    }

    #[tokio::test]
    async fn store_writes_payload_and_timestamp() {
        let (vault, backend) = vault();
        let cred = credential(12, 7, "AWS");
        vault.store(7, &cred, "AKIA/secret").await.unwrap();

        let record = backend.read("secret/pado/7/AWS/12").await.unwrap().unwrap();
        assert_eq!(record[PAYLOAD_FIELD], "AKIA/secret");
        assert!(record[CREATED_AT_FIELD].ends_with('Z'));
        assert_eq!(vault.fetch(7, &cred).await.unwrap(), "AKIA/secret");
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_io() {
        let (vault, backend) = vault();
        backend.set_failing(true);

        for (user_id, cred, payload) in [
            (0, credential(1, 0, "AWS"), "x"),
            (1, credential(0, 1, "AWS"), "x"),
            (1, credential(1, 2, "AWS"), "x"),
            (1, credential(1, 1, "  "), "x"),
            (1, credential(1, 1, "a/b"), "x"),
            (1, credential(1, 1, "AWS"), "   "),
        ] {
            let err = vault.store(user_id, &cred, payload).await.unwrap_err();
            assert!(matches!(err, VaultError::InvalidInput { .. }), "{err}");
        }
    }

    #[tokio::test]
    async fn fetch_distinguishes_missing_from_failing() {
        let (vault, backend) = vault();
        let cred = credential(3, 1, "AWS");
        assert!(matches!(
            vault.fetch(1, &cred).await,
            Err(VaultError::NotFound { credential_id: 3 })
        ));

        backend.set_failing(true);
        assert!(matches!(
            vault.fetch(1, &cred).await,
            Err(VaultError::OperationFailed(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let (vault, backend) = vault();
        let cred = credential(3, 1, "AWS");
        vault.store(1, &cred, "p").await.unwrap();
        vault.delete(1, &cred).await.unwrap();
        assert!(backend.is_empty().await);
        vault.delete(1, &cred).await.unwrap();
    }

    #[tokio::test]
    async fn disabled_store_is_unavailable() {
        let vault = CredentialVault::new(SecretStoreClient::disabled(), DEFAULT_BASE_PATH);
        let cred = credential(3, 1, "AWS");
        assert!(matches!(
            vault.store(1, &cred, "p").await,
            Err(VaultError::Unavailable)
        ));
        assert!(!vault.is_available().await);
    }
}
