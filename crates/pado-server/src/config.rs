//! Server configuration for Pado.
//!
//! Loads configuration from environment variables with defaults. The
//! deployment profile decides which shortcuts are allowed: `dev` and `ci`
//! may run on in-memory repositories, without a revocation cache and without
//! a secret store; `prod` refuses all three.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use pado_core::token::TokenConfig;
use pado_core::vault::DEFAULT_BASE_PATH;

/// Access-token lifetime in the `dev` profile.
const DEV_ACCESS_TTL_SECS: i64 = 86_400;
/// Access-token lifetime everywhere else.
const ACCESS_TTL_SECS: i64 = 3_600;
const REFRESH_TTL_SECS: i64 = 604_800;
const DEFAULT_PORT: u16 = 8080;

/// Deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Ci,
    Prod,
}

impl Profile {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Ci => "ci",
            Self::Prod => "prod",
        }
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "local" => Ok(Self::Dev),
            "ci" | "test" => Ok(Self::Ci),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(ConfigError::Invalid {
                key: "PADO_PROFILE",
                reason: format!("unknown profile '{other}'"),
            }),
        }
    }
}

/// Configuration errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("{key} must be set")]
    Missing { key: &'static str },

    /// A variable holds a value that cannot be used.
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    /// The profile forbids the configured shortcut.
    #[error("{key} is required in the prod profile")]
    RequiredInProd { key: &'static str },
}

/// Secret store connection settings.
#[derive(Clone)]
pub struct SecretStoreSettings {
    pub enabled: bool,
    pub addr: String,
    pub token: String,
    pub base_path: String,
}

impl fmt::Debug for SecretStoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStoreSettings")
            .field("enabled", &self.enabled)
            .field("addr", &self.addr)
            .field("token", &"[redacted]")
            .field("base_path", &self.base_path)
            .finish()
    }
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    pub profile: Profile,
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// PostgreSQL URL. `None` selects the in-memory repositories.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    /// Redis URL for the revocation cache. `None` selects the no-op store.
    pub redis_url: Option<String>,
    pub secret_store: SecretStoreSettings,
    /// Allowed CORS origins; `*` allows any.
    pub cors_allowed_origins: Vec<String>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("profile", &self.profile)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database", &self.database_url.as_ref().map(|_| "[redacted]"))
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("redis", &self.redis_url.as_ref().map(|_| "[redacted]"))
            .field("secret_store", &self.secret_store)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `PADO_PROFILE`: `dev`, `ci` or `prod` (default: `dev`)
    /// - `PADO_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:8080`)
    /// - `PORT`: port to bind on `0.0.0.0`
    /// - `PADO_LOG_LEVEL`: log filter (default: `info`)
    /// - `DATABASE_URL`: PostgreSQL connection string (required in `prod`)
    /// - `JWT_SECRET`: token signing secret (required)
    /// - `JWT_ACCESS_TTL_SECS`: access-token lifetime (default: 1 day in `dev`, 1 hour otherwise)
    /// - `JWT_REFRESH_TTL_SECS`: refresh-token lifetime (default: 7 days)
    /// - `REDIS_URL`: revocation cache (required in `prod`)
    /// - `VAULT_ENABLED`: `false` disables the secret store outside `prod` (default: `true`)
    /// - `VAULT_ADDR`, `VAULT_TOKEN`, `VAULT_BASE_PATH`: secret store settings
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated origins
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required value is missing or the
    /// profile refuses the configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let profile = match get("PADO_PROFILE") {
            Some(raw) => raw.parse()?,
            None => Profile::Dev,
        };

        // Priority: PADO_BIND_ADDR > PORT > default 127.0.0.1:8080
        let default_addr = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT));
        let bind_addr = if let Some(addr) = get("PADO_BIND_ADDR") {
            addr.parse().unwrap_or(default_addr)
        } else if let Some(port) = get("PORT") {
            SocketAddr::from(([0, 0, 0, 0], port.parse().unwrap_or(DEFAULT_PORT)))
        } else {
            default_addr
        };

        let log_level = get("PADO_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing { key: "JWT_SECRET" })?;

        let default_access = if profile == Profile::Dev {
            DEV_ACCESS_TTL_SECS
        } else {
            ACCESS_TTL_SECS
        };
        let positive = |key: &str, default: i64| {
            get(key)
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        let access_ttl_secs = positive("JWT_ACCESS_TTL_SECS", default_access);
        let refresh_ttl_secs = positive("JWT_REFRESH_TTL_SECS", REFRESH_TTL_SECS);

        let database_url = get("DATABASE_URL");
        let redis_url = get("REDIS_URL");

        let vault_enabled = profile == Profile::Prod
            || get("VAULT_ENABLED").is_none_or(|v| !matches!(v.trim(), "false" | "0"));
        let secret_store = SecretStoreSettings {
            enabled: vault_enabled,
            addr: get("VAULT_ADDR").unwrap_or_else(|| "http://127.0.0.1:8200".to_owned()),
            token: get("VAULT_TOKEN").unwrap_or_default(),
            base_path: get("VAULT_BASE_PATH").unwrap_or_else(|| DEFAULT_BASE_PATH.to_owned()),
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        if profile == Profile::Prod {
            if database_url.is_none() {
                return Err(ConfigError::RequiredInProd {
                    key: "DATABASE_URL",
                });
            }
            if redis_url.is_none() {
                return Err(ConfigError::RequiredInProd { key: "REDIS_URL" });
            }
        }

        Ok(Self {
            profile,
            bind_addr,
            log_level,
            database_url,
            jwt_secret,
            access_ttl_secs,
            refresh_ttl_secs,
            redis_url,
            secret_store,
            cors_allowed_origins,
        })
    }

    /// Token settings derived from this configuration.
    #[must_use]
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            secret: self.jwt_secret.clone(),
            access_ttl: chrono::Duration::seconds(self.access_ttl_secs),
            refresh_ttl: chrono::Duration::seconds(self.refresh_ttl_secs),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn dev_defaults() {
        let config = load(&[("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.profile, Profile::Dev);
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.access_ttl_secs, 86_400);
        assert_eq!(config.refresh_ttl_secs, 604_800);
        assert!(config.database_url.is_none());
        assert!(config.redis_url.is_none());
        assert!(config.secret_store.enabled);
        assert_eq!(config.secret_store.base_path, "secret/pado");
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn jwt_secret_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::Missing { key: "JWT_SECRET" })
        ));
        assert!(matches!(
            load(&[("JWT_SECRET", "   ")]),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn port_binds_all_interfaces_unless_addr_given() {
        let config = load(&[("JWT_SECRET", "s"), ("PORT", "9000")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());

        let config = load(&[
            ("JWT_SECRET", "s"),
            ("PORT", "9000"),
            ("PADO_BIND_ADDR", "127.0.0.1:7000"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn ci_uses_short_access_tokens_and_may_disable_vault() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("PADO_PROFILE", "ci"),
            ("VAULT_ENABLED", "false"),
        ])
        .unwrap();
        assert_eq!(config.access_ttl_secs, 3_600);
        assert!(!config.secret_store.enabled);
    }

    #[test]
    fn prod_refuses_shortcuts() {
        let base = [("JWT_SECRET", "s"), ("PADO_PROFILE", "prod")];
        assert!(matches!(
            load(&base),
            Err(ConfigError::RequiredInProd {
                key: "DATABASE_URL"
            })
        ));

        let with_db = [base[0], base[1], ("DATABASE_URL", "postgres://db/pado")];
        assert!(matches!(
            load(&with_db),
            Err(ConfigError::RequiredInProd { key: "REDIS_URL" })
        ));

        let full = [
            with_db[0],
            with_db[1],
            with_db[2],
            ("REDIS_URL", "redis://cache"),
            ("VAULT_ENABLED", "false"),
        ];
        let config = load(&full).unwrap();
        assert!(config.secret_store.enabled);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("JWT_ACCESS_TTL_SECS", "soon"),
            ("JWT_REFRESH_TTL_SECS", "-5"),
        ])
        .unwrap();
        assert_eq!(config.access_ttl_secs, 86_400);
        assert_eq!(config.refresh_ttl_secs, 604_800);
    }

    #[test]
    fn unknown_profile_is_an_error() {
        assert!(matches!(
            load(&[("JWT_SECRET", "s"), ("PADO_PROFILE", "staging")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test,,"),
        ])
        .unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            ["http://a.test", "http://b.test"]
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load(&[
            ("JWT_SECRET", "super-secret-value"),
            ("VAULT_TOKEN", "hvs.token"),
            ("DATABASE_URL", "postgres://user:pw@db/pado"),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(!rendered.contains("hvs.token"));
        assert!(!rendered.contains("pw@db"));
    }
}
