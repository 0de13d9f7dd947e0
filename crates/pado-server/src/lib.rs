//! Pado HTTP server.
//!
//! Wires the core services, the repositories and the secret store client
//! into an Axum router. Identity is resolved once per request by the gate
//! middleware; routes that need a caller take the `Authenticated` extractor.

pub mod config;
pub mod error;
pub mod middleware;
#[cfg(feature = "postgres")]
pub mod repository;
pub mod routes;
pub mod state;
