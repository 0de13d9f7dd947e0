//! Credential management: metadata in the relational store, payload in the
//! vault.
//!
//! The two writes are not atomic. Create inserts the metadata row first and
//! deletes it again if the vault write fails; delete removes the payload
//! first and the row second. Either way a failure leaves at worst a row
//! without a payload, never a payload without a row.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{CredentialError, RepositoryError};
use crate::models::{Credential, Identity, NewCredential};
use crate::repository::CredentialRepository;
use crate::vault::CredentialVault;

/// Input for [`CredentialService::create`].
#[derive(Clone)]
pub struct NewCredentialRequest {
    pub name: String,
    pub credential_type: String,
    pub description: String,
    pub data: String,
}

impl std::fmt::Debug for NewCredentialRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewCredentialRequest")
            .field("name", &self.name)
            .field("credential_type", &self.credential_type)
            .finish_non_exhaustive()
    }
}

/// Credential metadata together with its payload.
#[derive(Clone)]
pub struct CredentialDetail {
    pub credential: Credential,
    pub data: String,
}

impl std::fmt::Debug for CredentialDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDetail")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

/// Owner-scoped credential operations.
#[derive(Clone)]
pub struct CredentialService {
    credentials: Arc<dyn CredentialRepository>,
    vault: CredentialVault,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("vault", &self.vault)
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialRepository>, vault: CredentialVault) -> Self {
        Self { credentials, vault }
    }

    /// Register a credential for `owner` and store its payload.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::InvalidRequest`] if name, type or data is blank
    /// - [`CredentialError::AlreadyExists`] if `owner` already has a
    ///   credential with this name
    /// - [`CredentialError::Vault`] if the payload cannot be stored (the
    ///   metadata row is removed again)
    /// - [`CredentialError::Repository`] on store failures
    pub async fn create(
        &self,
        owner: &Identity,
        request: NewCredentialRequest,
    ) -> Result<Credential, CredentialError> {
        for (field, value) in [
            ("name", &request.name),
            ("type", &request.credential_type),
            ("data", &request.data),
        ] {
            if value.trim().is_empty() {
                return Err(CredentialError::InvalidRequest {
                    reason: format!("credential {field} is required"),
                });
            }
        }

        if self
            .credentials
            .exists_by_user_and_name(owner.user_id, &request.name)
            .await?
        {
            warn!(user_id = owner.user_id, name = %request.name, "duplicate credential name");
            return Err(CredentialError::AlreadyExists { name: request.name });
        }

        let credential = self
            .credentials
            .create(NewCredential {
                user_id: owner.user_id,
                name: request.name.clone(),
                credential_type: request.credential_type,
                description: request.description,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::UniqueViolation { .. } => {
                    warn!(
                        user_id = owner.user_id,
                        name = %request.name,
                        "duplicate credential name caught by store"
                    );
                    CredentialError::AlreadyExists {
                        name: request.name.clone(),
                    }
                }
                other => CredentialError::Repository(other),
            })?;

        if let Err(e) = self
            .vault
            .store(owner.user_id, &credential, &request.data)
            .await
        {
            self.compensate(&credential).await;
            return Err(e.into());
        }

        info!(
            user_id = owner.user_id,
            credential_id = credential.id,
            "credential registered"
        );
        Ok(credential)
    }

    /// All credentials owned by `owner`, without payloads.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Repository`] on store failures.
    pub async fn list(&self, owner: &Identity) -> Result<Vec<Credential>, CredentialError> {
        Ok(self.credentials.list_by_user(owner.user_id).await?)
    }

    /// One credential with its payload.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::NotFound`] if no such credential exists
    /// - [`CredentialError::Forbidden`] if it belongs to another user; the
    ///   payload is not read
    /// - [`CredentialError::Vault`] if the payload is missing or unreadable
    /// - [`CredentialError::Repository`] on store failures
    pub async fn get(&self, owner: &Identity, id: i64) -> Result<CredentialDetail, CredentialError> {
        let credential = self.owned(owner, id).await?;
        let data = self.vault.fetch(owner.user_id, &credential).await?;
        Ok(CredentialDetail { credential, data })
    }

    /// Delete a credential and its payload.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::NotFound`] or [`CredentialError::Forbidden`] as
    ///   for [`CredentialService::get`]
    /// - [`CredentialError::Vault`] if the payload cannot be deleted; the
    ///   metadata row is kept
    /// - [`CredentialError::Repository`] on store failures
    pub async fn delete(&self, owner: &Identity, id: i64) -> Result<(), CredentialError> {
        let credential = self.owned(owner, id).await?;
        self.vault.delete(owner.user_id, &credential).await?;
        if !self.credentials.delete(credential.id).await? {
            return Err(CredentialError::NotFound { id });
        }
        info!(
            user_id = owner.user_id,
            credential_id = credential.id,
            "credential deleted"
        );
        Ok(())
    }

    async fn owned(&self, owner: &Identity, id: i64) -> Result<Credential, CredentialError> {
        let credential = self
            .credentials
            .find_by_id(id)
            .await?
            .ok_or(CredentialError::NotFound { id })?;
        if credential.user_id != owner.user_id {
            warn!(
                user_id = owner.user_id,
                credential_id = id,
                "access to another user's credential denied"
            );
            return Err(CredentialError::Forbidden { id });
        }
        Ok(credential)
    }

    async fn compensate(&self, credential: &Credential) {
        match self.credentials.delete(credential.id).await {
            Ok(_) => warn!(
                credential_id = credential.id,
                "vault write failed, credential metadata rolled back"
            ),
            Err(e) => error!(
                credential_id = credential.id,
                error = %e,
                "vault write failed and metadata rollback failed, row is orphaned"
            ),
        }
    }
}
