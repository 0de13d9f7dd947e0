//! Refresh-token revocation.
//!
//! A revoked token is remembered only until its own expiry; after that the
//! signature check rejects it anyway. Backends are keyed by a SHA-256 digest
//! of the token so raw token strings never reach the cache.
//!
//! [`SessionRevocationStore`] wraps a backend with two asymmetric failure
//! rules: a failed write is logged and forgotten, a failed read counts as
//! revoked.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::RevocationError;
use crate::token::TokenIssuer;

/// Namespace prefix for revocation keys in a shared cache.
pub const KEY_PREFIX: &str = "blacklist:";

/// Cache key for `token`: the prefix followed by the hex SHA-256 digest.
#[must_use]
pub fn revocation_key(token: &str) -> String {
    format!("{KEY_PREFIX}{}", hex::encode(Sha256::digest(token.as_bytes())))
}

/// A store of revoked tokens with per-entry expiry.
#[async_trait]
pub trait RevocationBackend: Send + Sync + 'static {
    /// Remember `token` as revoked for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`RevocationError::Backend`] if the write fails.
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), RevocationError>;

    /// Whether `token` is currently remembered as revoked.
    ///
    /// # Errors
    ///
    /// Returns [`RevocationError::Backend`] if the lookup fails.
    async fn is_revoked(&self, token: &str) -> Result<bool, RevocationError>;
}

/// Backend that remembers nothing. Used when no cache is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRevocationBackend;

#[async_trait]
impl RevocationBackend for NoopRevocationBackend {
    async fn revoke(&self, _token: &str, _ttl: Duration) -> Result<(), RevocationError> {
        debug!("revocation cache disabled, token not recorded");
        Ok(())
    }

    async fn is_revoked(&self, _token: &str) -> Result<bool, RevocationError> {
        Ok(false)
    }
}

/// Process-local backend. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRevocationBackend {
    entries: Arc<RwLock<HashMap<String, Instant>>>,
}

impl MemoryRevocationBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries still held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RevocationBackend for MemoryRevocationBackend {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), RevocationError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, deadline| *deadline > now);
        entries.insert(revocation_key(token), now + ttl);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, RevocationError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&revocation_key(token))
            .is_some_and(|deadline| *deadline > Instant::now()))
    }
}

#[cfg(feature = "redis-revocation")]
pub use self::redis_backend::RedisRevocationBackend;

#[cfg(feature = "redis-revocation")]
mod redis_backend {
    use std::time::Duration;

    use async_trait::async_trait;
    use redis::AsyncCommands;
    use redis::aio::ConnectionManager;
    use tracing::debug;

    use super::{RevocationBackend, revocation_key};
    use crate::error::RevocationError;

    /// Redis backend. Entries are written with `PSETEX` so Redis expires them.
    #[derive(Clone)]
    pub struct RedisRevocationBackend {
        conn: ConnectionManager,
    }

    impl std::fmt::Debug for RedisRevocationBackend {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisRevocationBackend").finish_non_exhaustive()
        }
    }

    impl RedisRevocationBackend {
        /// Connect to the Redis server at `url`.
        ///
        /// # Errors
        ///
        /// Returns [`RevocationError::Backend`] if the URL is invalid or the
        /// server is unreachable.
        pub async fn connect(url: &str) -> Result<Self, RevocationError> {
            let client = redis::Client::open(url).map_err(|e| RevocationError::Backend {
                reason: format!("invalid redis url: {e}"),
            })?;
            let conn = ConnectionManager::new(client)
                .await
                .map_err(|e| RevocationError::Backend {
                    reason: format!("failed to connect to redis: {e}"),
                })?;
            debug!("redis revocation backend connected");
            Ok(Self { conn })
        }
    }

    #[async_trait]
    impl RevocationBackend for RedisRevocationBackend {
        async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), RevocationError> {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            let mut conn = self.conn.clone();
            conn.pset_ex::<_, _, ()>(revocation_key(token), "true", millis)
                .await
                .map_err(|e| RevocationError::Backend {
                    reason: e.to_string(),
                })
        }

        async fn is_revoked(&self, token: &str) -> Result<bool, RevocationError> {
            let mut conn = self.conn.clone();
            conn.exists::<_, bool>(revocation_key(token))
                .await
                .map_err(|e| RevocationError::Backend {
                    reason: e.to_string(),
                })
        }
    }
}

/// Revocation policy over a backend.
#[derive(Clone)]
pub struct SessionRevocationStore {
    backend: Arc<dyn RevocationBackend>,
    tokens: Arc<TokenIssuer>,
}

impl std::fmt::Debug for SessionRevocationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRevocationStore").finish_non_exhaustive()
    }
}

impl SessionRevocationStore {
    #[must_use]
    pub fn new(backend: Arc<dyn RevocationBackend>, tokens: Arc<TokenIssuer>) -> Self {
        Self { backend, tokens }
    }

    /// Record `token` as revoked until its own expiry.
    ///
    /// Tokens that are unverifiable or already expired are skipped. Backend
    /// failures are logged and otherwise ignored.
    pub async fn revoke(&self, token: &str) {
        let expires_at = match self.tokens.expires_at(token) {
            Ok(at) => at,
            Err(e) => {
                warn!(error = %e, "cannot revoke unverifiable token");
                return;
            }
        };

        let Ok(ttl) = (expires_at - Utc::now()).to_std() else {
            debug!("token already expired, nothing to revoke");
            return;
        };
        if ttl.is_zero() {
            debug!("token already expired, nothing to revoke");
            return;
        }

        match self.backend.revoke(token, ttl).await {
            Ok(()) => info!(ttl_secs = ttl.as_secs(), "token revoked"),
            Err(e) => error!(error = %e, "failed to record token revocation"),
        }
    }

    /// Whether `token` is revoked. A backend failure answers `true`.
    pub async fn is_revoked(&self, token: &str) -> bool {
        match self.backend.is_revoked(token).await {
            Ok(revoked) => revoked,
            Err(e) => {
                error!(error = %e, "revocation lookup failed, treating token as revoked");
                true
            }
        }
    }
}
