//! Pado server entry point.
//!
//! Loads configuration, selects the repositories, revocation backend and
//! secret store for the active profile, then starts the Axum HTTP server
//! with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use pado_core::repository::{
    CredentialRepository, MemoryCredentialRepository, MemoryUserRepository, UserRepository,
};
use pado_core::revocation::{NoopRevocationBackend, RedisRevocationBackend, RevocationBackend};
use pado_storage::{SecretStoreClient, VaultKvBackend};

use pado_server::config::ServerConfig;
use pado_server::routes;
use pado_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(profile = config.profile.as_str(), "Pado starting");

    let state = Arc::new(build_app_state(&config).await?);
    let app = routes::build_router(state, &config.cors_allowed_origins);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Pado server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Pado server stopped");
    Ok(())
}

/// Build the shared application state for the configured profile.
async fn build_app_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let (users, credentials) = build_repositories(config).await?;

    let revocation: Arc<dyn RevocationBackend> = if let Some(url) = &config.redis_url {
        info!("using Redis revocation cache");
        Arc::new(
            RedisRevocationBackend::connect(url)
                .await
                .context("failed to connect to the revocation cache")?,
        )
    } else {
        warn!("REDIS_URL not set: signed-out refresh tokens will not be remembered");
        Arc::new(NoopRevocationBackend)
    };

    let secret_store = if config.secret_store.enabled {
        let backend = VaultKvBackend::new(&config.secret_store.addr, &config.secret_store.token)
            .context("failed to configure the secret store")?;
        info!(addr = %config.secret_store.addr, "secret store enabled");
        SecretStoreClient::new(Arc::new(backend))
    } else {
        warn!("secret store disabled: credential payload operations will fail");
        SecretStoreClient::disabled()
    };

    Ok(AppState::new(
        &config.token_config(),
        users,
        credentials,
        revocation,
        secret_store,
        &config.secret_store.base_path,
    ))
}

type Repositories = (Arc<dyn UserRepository>, Arc<dyn CredentialRepository>);

async fn build_repositories(config: &ServerConfig) -> anyhow::Result<Repositories> {
    let Some(url) = &config.database_url else {
        info!("DATABASE_URL not set: using in-memory repositories (data will not persist)");
        return Ok((
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryCredentialRepository::new()),
        ));
    };
    connect_postgres(url).await
}

#[cfg(feature = "postgres")]
async fn connect_postgres(url: &str) -> anyhow::Result<Repositories> {
    use pado_server::repository::{self, PgCredentialRepository, PgUserRepository};

    info!(url = %"[redacted]", "using PostgreSQL repositories");
    let pool = repository::connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    repository::migrate(&pool)
        .await
        .context("failed to create tables")?;
    Ok((
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgCredentialRepository::new(pool)),
    ))
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(_url: &str) -> anyhow::Result<Repositories> {
    anyhow::bail!("DATABASE_URL is set but feature 'postgres' is not enabled");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
