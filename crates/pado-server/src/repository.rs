//! PostgreSQL repositories for users and credential metadata.
//!
//! Queries use parameterized statements (sqlx). Unique violations
//! (SQLSTATE `23505`) surface as [`RepositoryError::UniqueViolation`] carrying
//! the constraint name, the same signal the in-memory repositories give.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use pado_core::error::RepositoryError;
use pado_core::models::{Credential, NewCredential, NewUser, User};
use pado_core::repository::{CredentialRepository, UserRepository};

const MAX_CONNECTIONS: u32 = 10;

const CREATE_USERS: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id            BIGSERIAL PRIMARY KEY,
    name          TEXT NOT NULL CONSTRAINT users_name_key UNIQUE,
    email         TEXT NOT NULL CONSTRAINT users_email_key UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'USER',
    created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const CREATE_CREDENTIALS: &str = r"
CREATE TABLE IF NOT EXISTS credentials (
    id              BIGSERIAL PRIMARY KEY,
    user_id         BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    name            TEXT NOT NULL,
    credential_type TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT credentials_user_id_name_key UNIQUE (user_id, name)
)";

/// Connect a pool to `url`.
///
/// # Errors
///
/// Returns [`RepositoryError::Backend`] if the database is unreachable.
pub async fn connect(url: &str) -> Result<PgPool, RepositoryError> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(url)
        .await
        .map_err(map_sqlx)
}

/// Create the tables if they do not exist yet.
///
/// # Errors
///
/// Returns [`RepositoryError::Backend`] if a statement fails.
pub async fn migrate(pool: &PgPool) -> Result<(), RepositoryError> {
    for statement in [CREATE_USERS, CREATE_CREDENTIALS] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(map_sqlx)?;
    }
    Ok(())
}

fn map_sqlx(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return RepositoryError::UniqueViolation {
                constraint: db_err.constraint().unwrap_or_default().to_owned(),
            };
        }
    }
    RepositoryError::Backend {
        reason: format!("database error: {err}"),
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|reason| RepositoryError::Backend { reason })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    user_id: i64,
    name: String,
    credential_type: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            credential_type: row.credential_type,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// [`UserRepository`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"INSERT INTO users (name, email, password_hash, role)
              VALUES ($1, $2, $3, $4)
              RETURNING *",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?
        .try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .map(User::try_from)
            .transpose()
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }
}

/// [`CredentialRepository`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgCredentialRepository {
    pool: PgPool,
}

impl PgCredentialRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRepository for PgCredentialRepository {
    async fn create(&self, credential: NewCredential) -> Result<Credential, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"INSERT INTO credentials (user_id, name, credential_type, description)
              VALUES ($1, $2, $3, $4)
              RETURNING *",
        )
        .bind(credential.user_id)
        .bind(&credential.name)
        .bind(&credential.credential_type)
        .bind(&credential.description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Credential>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>("SELECT * FROM credentials WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(Credential::from))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Credential>, RepositoryError> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            "SELECT * FROM credentials WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Credential::from).collect())
    }

    async fn exists_by_user_and_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM credentials WHERE user_id = $1 AND name = $2)",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM credentials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    /// Driver error with a fixed SQLSTATE and constraint.
    #[derive(Debug)]
    struct FakeDbError {
        code: &'static str,
        constraint: Option<&'static str>,
    }

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "SQLSTATE {}", self.code)
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> ErrorKind {
            if self.code == "23505" {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    fn db_error(code: &'static str, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError { code, constraint }))
    }

    #[test]
    fn unique_violation_keeps_constraint_name() {
        let err = map_sqlx(db_error("23505", Some("credentials_user_id_name_key")));
        assert!(matches!(
            err,
            RepositoryError::UniqueViolation { ref constraint }
                if constraint == "credentials_user_id_name_key"
        ));
    }

    #[test]
    fn other_database_errors_are_backend_failures() {
        assert!(matches!(
            map_sqlx(db_error("23503", Some("credentials_user_id_fkey"))),
            RepositoryError::Backend { .. }
        ));
        assert!(matches!(
            map_sqlx(sqlx::Error::RowNotFound),
            RepositoryError::Backend { .. }
        ));
    }
}
