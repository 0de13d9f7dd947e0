//! Signup, signin and signout.
//!
//! There is no session object: a session is the token pair handed out by
//! signup or signin, and ending one means revoking its refresh token. Several
//! sessions per user may be live at once.

use std::sync::{Arc, LazyLock};

use tracing::{info, warn};

use crate::error::{AuthError, RepositoryError};
use crate::models::{Identity, NewUser, Role};
use crate::password::{hash_password, verify_password};
use crate::repository::{USERS_NAME_KEY, UserRepository};
use crate::revocation::SessionRevocationStore;
use crate::token::{TokenIssuer, TokenKind, TokenPair};

/// Characters allowed, and one required, in a password besides letters and
/// digits.
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// Hash checked when the user name is unknown, so both signin failures cost
/// one Argon2 verification.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("Pado-unknown-user-1!").unwrap_or_default());

/// Result of a successful signup.
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub user_id: i64,
    pub tokens: TokenPair,
}

/// Check a login name: 4 to 20 ASCII letters or digits, starting with a
/// letter.
///
/// # Errors
///
/// Returns [`AuthError::InvalidRequest`] describing the first violation.
pub fn validate_login_name(name: &str) -> Result<(), AuthError> {
    let len = name.chars().count();
    if !(4..=20).contains(&len) {
        return Err(invalid("user name must be 4 to 20 characters"));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(invalid("user name must start with a letter"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("user name may contain only letters and digits"));
    }
    Ok(())
}

/// Check a password: 8 to 20 characters from letters, digits and
/// [`PASSWORD_SPECIALS`], with at least one of each class.
///
/// # Errors
///
/// Returns [`AuthError::InvalidRequest`] describing the first violation.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if !(8..=20).contains(&len) {
        return Err(invalid("password must be 8 to 20 characters"));
    }
    let is_special = |c: char| PASSWORD_SPECIALS.contains(c);
    if !password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || is_special(c))
    {
        return Err(invalid("password contains an unsupported character"));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(is_special);
    if !(has_letter && has_digit && has_special) {
        return Err(invalid(
            "password needs at least one letter, one digit and one of @$!%*?&",
        ));
    }
    Ok(())
}

/// Check an email address for basic shape.
///
/// # Errors
///
/// Returns [`AuthError::InvalidRequest`] if the address is malformed.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let malformed = || invalid("email address is malformed");
    let (local, domain) = email.split_once('@').ok_or_else(malformed)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(malformed());
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return Err(malformed());
    };
    if host.is_empty() || tld.is_empty() {
        return Err(malformed());
    }
    Ok(())
}

fn invalid(reason: &str) -> AuthError {
    AuthError::InvalidRequest {
        reason: reason.to_owned(),
    }
}

/// User-facing authentication operations.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenIssuer>,
    revocation: Arc<SessionRevocationStore>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenIssuer>,
        revocation: Arc<SessionRevocationStore>,
    ) -> Self {
        Self {
            users,
            tokens,
            revocation,
        }
    }

    /// Register a user and open a first session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRequest`] if a field fails validation
    /// - [`AuthError::AlreadyRegistered`] if the email or name is taken,
    ///   including when a concurrent signup wins the race at the store
    /// - [`AuthError::Hashing`], [`AuthError::Token`] or
    ///   [`AuthError::Repository`] on internal failures
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SignupOutcome, AuthError> {
        validate_login_name(name)?;
        validate_email(email)?;
        validate_password(password)?;

        if self.users.exists_by_email(email).await? {
            warn!("signup rejected: email already registered");
            return Err(AuthError::AlreadyRegistered { field: "email" });
        }

        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::Hashing {
                reason: e.to_string(),
            })??;

        let user = self
            .users
            .create(NewUser {
                name: name.to_owned(),
                email: email.to_owned(),
                password_hash,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::UniqueViolation { constraint } => {
                    warn!(%constraint, "signup rejected by unique constraint");
                    AuthError::AlreadyRegistered {
                        field: if constraint == USERS_NAME_KEY {
                            "user name"
                        } else {
                            "email"
                        },
                    }
                }
                other => AuthError::Repository(other),
            })?;

        let tokens = self.tokens.issue_pair(&user.id.to_string())?;
        info!(user_id = user.id, "user signed up");
        Ok(SignupOutcome {
            user_id: user.id,
            tokens,
        })
    }

    /// Verify a name and password and open a new session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRequest`] if either field is blank
    /// - [`AuthError::InvalidCredentials`] for an unknown user or a wrong
    ///   password alike
    /// - [`AuthError::Hashing`], [`AuthError::Token`] or
    ///   [`AuthError::Repository`] on internal failures
    pub async fn signin(&self, name: &str, password: &str) -> Result<TokenPair, AuthError> {
        if name.trim().is_empty() || password.trim().is_empty() {
            return Err(invalid("user name and password are required"));
        }

        let user = self.users.find_by_name(name).await?;
        let stored = user
            .as_ref()
            .map_or_else(|| DUMMY_HASH.clone(), |u| u.password_hash.clone());
        let password = password.to_owned();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| AuthError::Hashing {
                reason: e.to_string(),
            })?;

        let Some(user) = user else {
            warn!("signin failed: unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if !matches {
            warn!(user_id = user.id, "signin failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.tokens.issue_pair(&user.id.to_string())?;
        info!(user_id = user.id, "user signed in");
        Ok(tokens)
    }

    /// End the session identified by `refresh_token`, which must belong to
    /// `caller`.
    ///
    /// Once the token has passed the checks below, nothing else can fail the
    /// call: revocation problems are logged and the signout still succeeds.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRequest`] if the token is blank or not a refresh
    ///   token
    /// - [`AuthError::Forbidden`] if the token belongs to another user
    pub async fn signout(&self, caller: &Identity, refresh_token: &str) -> Result<(), AuthError> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(invalid("refresh token is required"));
        }
        let claims = match self.tokens.claims(refresh_token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(user_id = caller.user_id, error = %e, "signout rejected: unreadable token");
                return Err(invalid("not a refresh token"));
            }
        };
        if claims.kind() != Some(TokenKind::Refresh) {
            warn!(user_id = caller.user_id, "signout rejected: not a refresh token");
            return Err(invalid("not a refresh token"));
        }
        if claims.sub != caller.user_id.to_string() {
            warn!(
                user_id = caller.user_id,
                "signout rejected: refresh token belongs to another user"
            );
            return Err(AuthError::Forbidden {
                reason: "refresh token belongs to another user".to_owned(),
            });
        }

        self.revocation.revoke(refresh_token).await;
        info!(user_id = caller.user_id, "user signed out");
        Ok(())
    }
}
