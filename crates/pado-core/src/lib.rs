//! Core library for Pado.
//!
//! Holds the authentication and session core (token issuance and validation,
//! refresh-token revocation, password hashing, the per-request gate) and the
//! credential lifecycle that splits each credential into relational metadata
//! and a secret-store payload. This crate depends on `pado-storage` for the
//! secret store client and knows nothing about HTTP or SQL.

pub mod auth;
pub mod credential;
pub mod error;
pub mod gate;
pub mod models;
pub mod password;
pub mod repository;
pub mod revocation;
pub mod token;
pub mod vault;
