//! Secret store client for Pado.
//!
//! This crate defines the [`SecretBackend`] trait, a path-addressed secret
//! store that knows nothing about users, credentials, or tokens. The credential
//! vault in `pado-core` derives paths and decides what goes into each record;
//! this layer only moves small string maps to and from the remote store.
//!
//! Two implementations are provided:
//!
//! - [`VaultKvBackend`]: HashiCorp Vault compatible KV HTTP API (feature `vault-backend`)
//! - [`MemoryBackend`]: in-memory, for tests and local development
//!
//! Callers go through [`SecretStoreClient`], which holds the backend as an
//! optional handle so a deployment without a secret store fails every call
//! through one `Unavailable` path.

mod client;
mod error;
mod memory;
#[cfg(feature = "vault-backend")]
mod vault_kv;

use std::collections::BTreeMap;

pub use client::{SecretStoreClient, mask_path};
pub use error::SecretStoreError;
pub use memory::MemoryBackend;
#[cfg(feature = "vault-backend")]
pub use vault_kv::VaultKvBackend;

/// The value stored at a secret path: a small map of string fields.
pub type SecretData = BTreeMap<String, String>;

/// A pluggable path-addressed secret store.
///
/// Paths are UTF-8 strings using `/` as a separator (e.g.
/// `secret/pado/7/AWS/12`). Values are small string maps; the backend is
/// responsible for encrypting them at rest.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait SecretBackend: Send + Sync + 'static {
    /// Write a record, overwriting any existing value at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::Write`] if the backend rejects the write.
    async fn write(&self, path: &str, data: &SecretData) -> Result<(), SecretStoreError>;

    /// Read the record at `path`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::Read`] if the backend fails.
    async fn read(&self, path: &str) -> Result<Option<SecretData>, SecretStoreError>;

    /// Delete the record at `path`. Deleting a missing path is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::Delete`] if the backend fails.
    async fn delete(&self, path: &str) -> Result<(), SecretStoreError>;

    /// Probe the backend for liveness.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::Health`] if the backend is unreachable or
    /// reports itself unhealthy.
    async fn health(&self) -> Result<(), SecretStoreError>;
}
