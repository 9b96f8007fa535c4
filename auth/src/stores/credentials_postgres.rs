//! `PostgreSQL` credential repository.
//!
//! Reads login credentials from a host-owned table with at least the columns
//! `id BIGINT`, `identity TEXT`, `secret_hash TEXT` and `display_name TEXT NULL`.

use crate::config::{DEFAULT_CREDENTIALS_TABLE, sanitize_identifier};
use crate::error::Result;
use crate::providers::{CredentialRecord, CredentialRepository};
use sqlx::PgPool;

/// `PostgreSQL` credential repository.
#[derive(Debug, Clone)]
pub struct PostgresCredentialRepository {
    pool: PgPool,
    table: String,
}

impl PostgresCredentialRepository {
    /// Create a repository over `table` (sanitized to `[A-Za-z0-9_]`).
    #[must_use]
    pub fn new(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: sanitize_identifier(table, DEFAULT_CREDENTIALS_TABLE),
        }
    }

    /// Create the credential table if it does not exist.
    ///
    /// Intended for development databases and tests; production schemas are
    /// usually owned by the host application.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::StoreUnavailable` if the DDL fails.
    pub async fn ensure_table(&self) -> Result<()> {
        let table = &self.table;
        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                identity VARCHAR(255) NOT NULL UNIQUE,
                secret_hash TEXT NOT NULL,
                display_name TEXT
            )
            "
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a credential row, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::StoreUnavailable` on query failure (including a
    /// duplicate identity).
    pub async fn insert(
        &self,
        identity: &str,
        secret_hash: &str,
        display_name: Option<&str>,
    ) -> Result<i64> {
        let table = &self.table;
        let (id,): (i64,) = sqlx::query_as(&format!(
            "INSERT INTO {table} (identity, secret_hash, display_name) VALUES ($1, $2, $3) RETURNING id"
        ))
        .bind(identity)
        .bind(secret_hash)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}

impl CredentialRepository for PostgresCredentialRepository {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<CredentialRecord>> {
        let table = &self.table;
        let row: Option<(i64, String, String, Option<String>)> = sqlx::query_as(&format!(
            "SELECT id, identity, secret_hash, display_name FROM {table} WHERE identity = $1 LIMIT 1"
        ))
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, identity, secret_hash, display_name)| CredentialRecord {
            id,
            identity,
            secret_hash,
            display_name,
        }))
    }

    async fn update_secret_hash(&self, identity: &str, new_hash: &str) -> Result<()> {
        let table = &self.table;
        sqlx::query(&format!("UPDATE {table} SET secret_hash = $1 WHERE identity = $2"))
            .bind(new_hash)
            .bind(identity)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
