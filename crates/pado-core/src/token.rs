//! Signed session tokens.
//!
//! Tokens are HS256 JWTs whose subject is the decimal user id and whose
//! `type` claim is `ACCESS` or `REFRESH`. Access tokens authenticate API
//! requests; refresh tokens exist only to be presented at signout.
//!
//! Validation failures are logged here, at the point of detection, and
//! reported to callers as a plain `false`.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TokenError;

/// Signing secrets shorter than this are accepted with a warning.
pub const MIN_SECRET_LEN: usize = 32;

/// Which of the two token kinds a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Value of the `type` claim.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "ACCESS",
            Self::Refresh => "REFRESH",
        }
    }

    fn from_claim(value: &str) -> Option<Self> {
        match value {
            "ACCESS" => Some(Self::Access),
            "REFRESH" => Some(Self::Refresh),
            _ => None,
        }
    }
}

/// Registered and private claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "type", default)]
    pub token_type: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The token kind, or `None` when the claim is absent or unrecognised.
    #[must_use]
    pub fn kind(&self) -> Option<TokenKind> {
        self.token_type.as_deref().and_then(TokenKind::from_claim)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Signing secret and lifetimes.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[redacted]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// An access/refresh pair issued at signup and signin.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair([redacted])")
    }
}

/// Issues, validates and inspects tokens signed with one shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    strict: Validation,
    lenient: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Build an issuer from `config`. A short secret is logged, not refused.
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        if config.secret.len() < MIN_SECRET_LEN {
            warn!(
                length = config.secret.len(),
                minimum = MIN_SECRET_LEN,
                "JWT signing secret is shorter than recommended"
            );
        }

        let mut strict = Validation::new(Algorithm::HS256);
        strict.leeway = 0;
        strict.validate_aud = false;
        strict.set_required_spec_claims(&["exp", "sub"]);

        // Signature and algorithm are still enforced; only expiry is skipped.
        let mut lenient = strict.clone();
        lenient.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            strict,
            lenient,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    /// Issue a token of `kind` for `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue(&self, subject: &str, kind: TokenKind) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        self.sign(subject, kind, ttl)
    }

    /// Issue an access and a refresh token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(subject, TokenKind::Access)?,
            refresh_token: self.issue(subject, TokenKind::Refresh)?,
        })
    }

    pub(crate) fn sign(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_owned(),
            token_type: Some(kind.as_str().to_owned()),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            TokenError::Signing {
                reason: e.to_string(),
            }
        })
    }

    /// Whether `token` is well formed, correctly signed with HS256 and
    /// unexpired. Never errors.
    #[must_use]
    pub fn validate(&self, token: &str) -> bool {
        match decode::<Claims>(token, &self.decoding, &self.strict) {
            Ok(_) => true,
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => warn!("token has expired"),
                    ErrorKind::InvalidSignature => warn!("token signature is invalid"),
                    ErrorKind::InvalidAlgorithm => warn!("token uses an unsupported algorithm"),
                    ErrorKind::InvalidToken
                    | ErrorKind::Base64(_)
                    | ErrorKind::Json(_)
                    | ErrorKind::Utf8(_) => warn!("token is malformed"),
                    _ => warn!(error = %e, "token rejected"),
                }
                false
            }
        }
    }

    /// Verified claims of `token`, ignoring expiry.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] if the token is malformed or its
    /// signature does not verify.
    pub fn claims(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.lenient)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid {
                reason: e.to_string(),
            })
    }

    /// Subject of `token`, readable even after expiry.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] if the token cannot be verified.
    pub fn extract_subject(&self, token: &str) -> Result<String, TokenError> {
        self.claims(token).map(|c| c.sub)
    }

    /// Subject of `token` parsed as a user id.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] if the token cannot be verified or the
    /// subject is not a decimal integer.
    pub fn extract_user_id(&self, token: &str) -> Result<i64, TokenError> {
        let subject = self.extract_subject(token)?;
        subject.parse().map_err(|_| TokenError::Invalid {
            reason: "subject is not a user id".to_owned(),
        })
    }

    /// Kind of `token`, or `None` if it cannot be verified or carries no
    /// recognised `type` claim.
    #[must_use]
    pub fn kind_of(&self, token: &str) -> Option<TokenKind> {
        self.claims(token).ok().and_then(|c| c.kind())
    }

    /// Expiry instant of `token`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] if the token cannot be verified or its
    /// expiry is out of range.
    pub fn expires_at(&self, token: &str) -> Result<DateTime<Utc>, TokenError> {
        self.claims(token)?
            .expires_at()
            .ok_or_else(|| TokenError::Invalid {
                reason: "expiry out of range".to_owned(),
            })
    }
}
