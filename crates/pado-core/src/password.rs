//! Argon2id password hashing.
//!
//! Hashes are stored in PHC string form so parameters travel with the hash.
//! Both functions are CPU-bound; async callers run them on the blocking pool.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::warn;

use crate::error::AuthError;

/// Hash `password` with a fresh random salt.
///
/// # Errors
///
/// Returns [`AuthError::Hashing`] if Argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing {
            reason: e.to_string(),
        })
}

/// Check `password` against a stored PHC hash. An unparseable hash never
/// matches.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "stored password hash is unreadable");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("Aa1!aaaa").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Aa1!aaaa", &hash));
        assert!(!verify_password("Aa1!aaab", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("Aa1!aaaa").unwrap();
        let b = hash_password("Aa1!aaaa").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!verify_password("anything", "plaintext"));
    }
}
