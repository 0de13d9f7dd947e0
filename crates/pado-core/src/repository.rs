//! Persistence seams for users and credential metadata.
//!
//! The traits are implemented by the Postgres repositories in `pado-server`
//! and by the in-memory repositories below, which back tests and local runs
//! without a database. Both enforce the same unique constraints and report
//! violations with the same constraint names.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::RepositoryError;
use crate::models::{Credential, NewCredential, NewUser, User};

/// Unique constraint on `users.email`.
pub const USERS_EMAIL_KEY: &str = "users_email_key";
/// Unique constraint on `users.name`.
pub const USERS_NAME_KEY: &str = "users_name_key";
/// Unique constraint on `credentials (user_id, name)`.
pub const CREDENTIALS_USER_NAME_KEY: &str = "credentials_user_id_name_key";

/// User storage.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Insert a user and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::UniqueViolation`] if the name or email is
    /// taken.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// # Errors
    ///
    /// Returns [`RepositoryError::Backend`] if the store fails.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    /// # Errors
    ///
    /// Returns [`RepositoryError::Backend`] if the store fails.
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, RepositoryError>;

    /// # Errors
    ///
    /// Returns [`RepositoryError::Backend`] if the store fails.
    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError>;
}

/// Credential metadata storage.
#[async_trait]
pub trait CredentialRepository: Send + Sync + 'static {
    /// Insert credential metadata and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::UniqueViolation`] if the owner already has a
    /// credential with this name.
    async fn create(&self, credential: NewCredential) -> Result<Credential, RepositoryError>;

    /// # Errors
    ///
    /// Returns [`RepositoryError::Backend`] if the store fails.
    async fn find_by_id(&self, id: i64) -> Result<Option<Credential>, RepositoryError>;

    /// All credentials owned by `user_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Backend`] if the store fails.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Credential>, RepositoryError>;

    /// # Errors
    ///
    /// Returns [`RepositoryError::Backend`] if the store fails.
    async fn exists_by_user_and_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<bool, RepositoryError>;

    /// Delete by id. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Backend`] if the store fails.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

#[derive(Debug)]
struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory [`UserRepository`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserRepository {
    table: Arc<RwLock<Table<User>>>,
}

impl MemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut table = self.table.write().await;
        if table.rows.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::UniqueViolation {
                constraint: USERS_EMAIL_KEY.to_owned(),
            });
        }
        if table.rows.values().any(|u| u.name == user.name) {
            return Err(RepositoryError::UniqueViolation {
                constraint: USERS_NAME_KEY.to_owned(),
            });
        }

        let now = Utc::now();
        let record = User {
            id: table.allocate_id(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.name == name).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.values().any(|u| u.email == email))
    }
}

/// In-memory [`CredentialRepository`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialRepository {
    table: Arc<RwLock<Table<Credential>>>,
}

impl MemoryCredentialRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials across all users.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rows.is_empty()
    }
}

#[async_trait]
impl CredentialRepository for MemoryCredentialRepository {
    async fn create(&self, credential: NewCredential) -> Result<Credential, RepositoryError> {
        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|c| c.user_id == credential.user_id && c.name == credential.name)
        {
            return Err(RepositoryError::UniqueViolation {
                constraint: CREDENTIALS_USER_NAME_KEY.to_owned(),
            });
        }

        let now = Utc::now();
        let record = Credential {
            id: table.allocate_id(),
            user_id: credential.user_id,
            name: credential.name,
            credential_type: credential.credential_type,
            description: credential.description,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Credential>, RepositoryError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Credential>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn exists_by_user_and_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<bool, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .any(|c| c.user_id == user_id && c.name == name))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}
