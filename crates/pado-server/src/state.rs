//! Shared application state for the Pado server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use std::sync::Arc;

use pado_core::auth::AuthService;
use pado_core::credential::CredentialService;
use pado_core::gate::AuthGate;
use pado_core::repository::{CredentialRepository, UserRepository};
use pado_core::revocation::{RevocationBackend, SessionRevocationStore};
use pado_core::token::{TokenConfig, TokenIssuer};
use pado_core::vault::CredentialVault;
use pado_storage::SecretStoreClient;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Signup, signin and signout.
    pub auth: AuthService,
    /// Owner-scoped credential operations.
    pub credentials: CredentialService,
    /// Bearer token to identity resolution.
    pub gate: AuthGate,
    /// Secret store handle, for the health probe.
    pub secret_store: SecretStoreClient,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the services over the given stores.
    #[must_use]
    pub fn new(
        token_config: &TokenConfig,
        users: Arc<dyn UserRepository>,
        credentials: Arc<dyn CredentialRepository>,
        revocation: Arc<dyn RevocationBackend>,
        secret_store: SecretStoreClient,
        secret_base_path: &str,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(token_config));
        let revocation = Arc::new(SessionRevocationStore::new(
            revocation,
            Arc::clone(&tokens),
        ));
        let vault = CredentialVault::new(secret_store.clone(), secret_base_path);

        Self {
            auth: AuthService::new(
                Arc::clone(&users),
                Arc::clone(&tokens),
                Arc::clone(&revocation),
            ),
            credentials: CredentialService::new(credentials, vault),
            gate: AuthGate::new(tokens, revocation, users),
            secret_store,
        }
    }
}
