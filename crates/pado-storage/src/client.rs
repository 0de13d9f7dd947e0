//! Optional-handle client over a [`SecretBackend`].
//!
//! The secret store can be switched off per deployment profile. Rather than
//! checking for a missing backend at every call site, the client owns the
//! `Option` and turns an absent backend into [`SecretStoreError::Unavailable`]
//! in exactly one place.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::{SecretBackend, SecretData, SecretStoreError};

/// Client handle used by the credential vault.
#[derive(Clone)]
pub struct SecretStoreClient {
    backend: Option<Arc<dyn SecretBackend>>,
}

impl std::fmt::Debug for SecretStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStoreClient")
            .field("enabled", &self.backend.is_some())
            .finish()
    }
}

impl SecretStoreClient {
    /// Create a client over a configured backend.
    #[must_use]
    pub fn new(backend: Arc<dyn SecretBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Create a client with no backend. Every operation fails with
    /// [`SecretStoreError::Unavailable`].
    #[must_use]
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Whether a backend is configured at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&self) -> Result<&Arc<dyn SecretBackend>, SecretStoreError> {
        self.backend.as_ref().ok_or_else(|| {
            warn!("secret store is not configured - operation rejected");
            SecretStoreError::Unavailable
        })
    }

    /// Write a record at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::Unavailable`] without a backend, or the
    /// backend's write error.
    pub async fn write(&self, path: &str, data: &SecretData) -> Result<(), SecretStoreError> {
        let backend = self.backend()?;
        match backend.write(path, data).await {
            Ok(()) => {
                debug!(path = %mask_path(path), "secret written");
                Ok(())
            }
            Err(e) => {
                error!(path = %mask_path(path), error = %e, "secret write failed");
                Err(e)
            }
        }
    }

    /// Read the record at `path`; `Ok(None)` when nothing is stored there.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::Unavailable`] without a backend, or the
    /// backend's read error.
    pub async fn read(&self, path: &str) -> Result<Option<SecretData>, SecretStoreError> {
        let backend = self.backend()?;
        match backend.read(path).await {
            Ok(Some(data)) => {
                debug!(path = %mask_path(path), "secret read");
                Ok(Some(data))
            }
            Ok(None) => {
                debug!(path = %mask_path(path), "no secret at path");
                Ok(None)
            }
            Err(e) => {
                error!(path = %mask_path(path), error = %e, "secret read failed");
                Err(e)
            }
        }
    }

    /// Delete the record at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretStoreError::Unavailable`] without a backend, or the
    /// backend's delete error.
    pub async fn delete(&self, path: &str) -> Result<(), SecretStoreError> {
        let backend = self.backend()?;
        match backend.delete(path).await {
            Ok(()) => {
                debug!(path = %mask_path(path), "secret deleted");
                Ok(())
            }
            Err(e) => {
                error!(path = %mask_path(path), error = %e, "secret delete failed");
                Err(e)
            }
        }
    }

    /// Probe the backend. `false` when disabled or unhealthy.
    pub async fn is_available(&self) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        match backend.health().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "secret store health check failed");
                false
            }
        }
    }
}

/// Mask a secret path for logging: keep the first and last segments, hide
/// everything in between.
///
/// `secret/pado/7/AWS/12` becomes `secret/****/****/****/12`.
#[must_use]
pub fn mask_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() <= 2 {
        return path.to_owned();
    }
    let last = segments.len() - 1;
    segments
        .iter()
        .enumerate()
        .map(|(i, s)| if i == 0 || i == last { *s } else { "****" })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::MemoryBackend;

    #[test]
    fn mask_hides_interior_segments() {
        assert_eq!(mask_path("secret/pado/7/AWS/12"), "secret/****/****/****/12");
        assert_eq!(mask_path("a/b"), "a/b");
        assert_eq!(mask_path("single"), "single");
    }

    #[tokio::test]
    async fn disabled_client_is_unavailable_everywhere() {
        let client = SecretStoreClient::disabled();
        assert!(!client.is_enabled());
        assert!(!client.is_available().await);
        assert!(matches!(
            client.write("p", &SecretData::new()).await,
            Err(SecretStoreError::Unavailable)
        ));
        assert!(matches!(
            client.read("p").await,
            Err(SecretStoreError::Unavailable)
        ));
        assert!(matches!(
            client.delete("p").await,
            Err(SecretStoreError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn enabled_client_delegates() {
        let backend = MemoryBackend::new();
        let client = SecretStoreClient::new(Arc::new(backend.clone()));
        let mut data = SecretData::new();
        data.insert("k".to_owned(), "v".to_owned());

        client.write("a/b/c", &data).await.unwrap();
        assert_eq!(client.read("a/b/c").await.unwrap(), Some(data));
        assert!(client.is_available().await);

        backend.set_failing(true);
        assert!(!client.is_available().await);
        assert!(client.read("a/b/c").await.is_err());
    }
}
