//! Per-request authentication.
//!
//! The gate never rejects a request itself. It either produces an
//! [`Identity`] or nothing, and the route decides whether it needed one.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::Identity;
use crate::repository::UserRepository;
use crate::revocation::SessionRevocationStore;
use crate::token::{TokenIssuer, TokenKind};

/// Exact paths that skip authentication.
const PUBLIC_EXACT: &[&str] = &["/signup", "/signin", "/health", "/components"];

/// Path prefixes that skip authentication.
const PUBLIC_PREFIXES: &[&str] = &["/swagger-ui", "/v3/api-docs", "/components/search"];

/// Whether `path` bypasses the gate.
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_EXACT.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves bearer tokens to identities.
#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<TokenIssuer>,
    revocation: Arc<SessionRevocationStore>,
    users: Arc<dyn UserRepository>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}

impl AuthGate {
    #[must_use]
    pub fn new(
        tokens: Arc<TokenIssuer>,
        revocation: Arc<SessionRevocationStore>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            tokens,
            revocation,
            users,
        }
    }

    /// Identity for the raw `Authorization` header value, if any.
    ///
    /// Yields nothing for a missing or non-bearer header, an invalid or
    /// expired token, a refresh token, a revoked token (or one whose status
    /// cannot be checked), a non-numeric subject, or an unknown user.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Option<Identity> {
        let token = bearer_token(authorization?)?;

        if !self.tokens.validate(token) {
            return None;
        }
        match self.tokens.kind_of(token) {
            Some(TokenKind::Access) => {}
            Some(TokenKind::Refresh) => {
                warn!("refresh token presented as access token");
                return None;
            }
            None => {
                warn!("token carries no recognised type");
                return None;
            }
        }
        if self.revocation.is_revoked(token).await {
            warn!("revoked token presented");
            return None;
        }

        let user_id = match self.tokens.extract_user_id(token) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "token subject is not a user id");
                return None;
            }
        };

        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => {
                debug!(user_id, "request authenticated");
                Some(Identity::from(&user))
            }
            Ok(None) => {
                warn!(user_id, "token subject does not exist");
                None
            }
            Err(e) => {
                warn!(user_id, error = %e, "failed to load token subject");
                None
            }
        }
    }
}
