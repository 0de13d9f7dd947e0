//! In-memory secret backend.
//!
//! Stores records in a `BTreeMap` behind a `RwLock`. Nothing is persisted and
//! nothing is encrypted. Use it for tests and for local
//! development without a running secret store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::{SecretBackend, SecretData, SecretStoreError};

/// An in-memory secret backend backed by a `BTreeMap`.
///
/// Clones share state. [`MemoryBackend::set_failing`] makes every operation
/// fail, which lets tests exercise upstream-failure paths.
///
/// # Examples
///
/// ```
/// # use pado_storage::{MemoryBackend, SecretBackend, SecretData};
/// # #[tokio::main]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// let mut data = SecretData::new();
/// data.insert("credentialData".to_owned(), "s3cr3t".to_owned());
/// backend.write("secret/pado/1/AWS/1", &data).await.unwrap();
/// assert_eq!(backend.read("secret/pado/1/AWS/1").await.unwrap(), Some(data));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<String, SecretData>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated backend failure for every operation.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether the backend holds no records.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    fn check(&self) -> Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            Err("simulated backend failure".to_owned())
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl SecretBackend for MemoryBackend {
    async fn write(&self, path: &str, data: &SecretData) -> Result<(), SecretStoreError> {
        self.check().map_err(|reason| SecretStoreError::Write {
            path: crate::mask_path(path),
            reason,
        })?;
        let mut records = self.data.write().await;
        records.insert(path.to_owned(), data.clone());
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Option<SecretData>, SecretStoreError> {
        self.check().map_err(|reason| SecretStoreError::Read {
            path: crate::mask_path(path),
            reason,
        })?;
        let records = self.data.read().await;
        Ok(records.get(path).cloned())
    }

    async fn delete(&self, path: &str) -> Result<(), SecretStoreError> {
        self.check().map_err(|reason| SecretStoreError::Delete {
            path: crate::mask_path(path),
            reason,
        })?;
        let mut records = self.data.write().await;
        records.remove(path);
        Ok(())
    }

    async fn health(&self) -> Result<(), SecretStoreError> {
        self.check()
            .map_err(|reason| SecretStoreError::Health { reason })
    }
}
