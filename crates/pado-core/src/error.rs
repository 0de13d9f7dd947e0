//! Error types for `pado-core`.
//!
//! Variants carry enough context to diagnose a failure from logs alone.
//! Passwords, token strings and credential payloads never appear in any
//! message.

use pado_storage::SecretStoreError;

/// Errors from the user and credential repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the insert.
    #[error("unique constraint '{constraint}' violated")]
    UniqueViolation { constraint: String },

    /// The backing store failed.
    #[error("repository backend error: {reason}")]
    Backend { reason: String },
}

/// Errors from signing or parsing tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signing a new token failed.
    #[error("token signing failed: {reason}")]
    Signing { reason: String },

    /// The token is malformed, carries a bad signature, or has unusable claims.
    #[error("invalid token: {reason}")]
    Invalid { reason: String },
}

/// Errors from a revocation backend.
#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    /// The backing cache failed.
    #[error("revocation store error: {reason}")]
    Backend { reason: String },
}

/// Errors from the credential vault.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// An identifier, type or payload failed validation before any I/O.
    #[error("invalid vault input: {reason}")]
    InvalidInput { reason: String },

    /// Nothing is stored for the credential.
    #[error("no secret stored for credential {credential_id}")]
    NotFound { credential_id: i64 },

    /// No secret store is configured for this deployment.
    #[error("secret store is not configured")]
    Unavailable,

    /// The secret store rejected or failed the operation.
    #[error("secret store operation failed: {0}")]
    OperationFailed(#[source] SecretStoreError),
}

impl From<SecretStoreError> for VaultError {
    fn from(err: SecretStoreError) -> Self {
        match err {
            SecretStoreError::Unavailable => Self::Unavailable,
            other => Self::OperationFailed(other),
        }
    }
}

/// Errors from signup, signin and signout.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is structurally invalid.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The login name or email is already taken.
    #[error("{field} is already registered")]
    AlreadyRegistered { field: &'static str },

    /// Unknown user or wrong password. The two are indistinguishable.
    #[error("invalid user name or password")]
    InvalidCredentials,

    /// The caller may not act on the presented token.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// Password hashing failed.
    #[error("password hashing failed: {reason}")]
    Hashing { reason: String },

    /// Token issuance failed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// The user repository failed.
    #[error("user repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors from credential management.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The request failed validation.
    #[error("invalid credential request: {reason}")]
    InvalidRequest { reason: String },

    /// The owner already has a credential with this name.
    #[error("credential '{name}' already exists")]
    AlreadyExists { name: String },

    /// No credential with this id.
    #[error("credential {id} not found")]
    NotFound { id: i64 },

    /// The credential exists but belongs to another user.
    #[error("credential {id} is not owned by the caller")]
    Forbidden { id: i64 },

    /// The vault failed.
    #[error("credential vault error: {0}")]
    Vault(#[from] VaultError),

    /// The credential repository failed.
    #[error("credential repository error: {0}")]
    Repository(#[from] RepositoryError),
}
