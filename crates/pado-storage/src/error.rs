//! Secret store error types.
//!
//! Every variant names the (masked) path it failed on so an operator can
//! diagnose the problem from logs alone. Payload values never appear here.

/// Errors that can occur while talking to the secret store.
#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    /// No backend is configured (disabled by profile or missing settings).
    #[error("secret store is not configured")]
    Unavailable,

    /// Failed to build the backend client.
    #[error("failed to initialise secret store client: {reason}")]
    Init { reason: String },

    /// Failed to read a record.
    #[error("failed to read secret at '{path}': {reason}")]
    Read { path: String, reason: String },

    /// Failed to write a record.
    #[error("failed to write secret at '{path}': {reason}")]
    Write { path: String, reason: String },

    /// Failed to delete a record.
    #[error("failed to delete secret at '{path}': {reason}")]
    Delete { path: String, reason: String },

    /// The health probe failed.
    #[error("secret store health check failed: {reason}")]
    Health { reason: String },
}
