//! `PostgreSQL` session store.
//!
//! One row per session in a configurable table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS user_sessions (
//!     session_id VARCHAR(128) NOT NULL PRIMARY KEY,
//!     expires_at BIGINT NOT NULL,
//!     data TEXT NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! CREATE INDEX IF NOT EXISTS user_sessions_expires_at_idx ON user_sessions (expires_at);
//! ```
//!
//! The table is created lazily; every operation waits for that to finish.
//!
//! # Example
//!
//! ```no_run
//! use sessionguard_auth::stores::PostgresSessionStore;
//! use sqlx::PgPool;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/app").await?;
//! let store = PostgresSessionStore::new(pool, "user_sessions", Duration::from_secs(86_400));
//! store.ready().await?;
//! # Ok(())
//! # }
//! ```

use crate::clock::{SharedClock, system_clock};
use crate::config::sanitize_identifier;
use crate::constants::DEFAULT_SESSION_TABLE;
use crate::error::Result;
use crate::providers::SessionStore;
use crate::state::{SessionData, SessionId};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// `PostgreSQL` session store.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
    table: String,
    default_ttl: Duration,
    clock: SharedClock,
    ready: Arc<OnceCell<()>>,
}

impl PostgresSessionStore {
    /// Create a store over `table` (sanitized to `[A-Za-z0-9_]`).
    #[must_use]
    pub fn new(pool: PgPool, table: &str, default_ttl: Duration) -> Self {
        Self::with_clock(pool, table, default_ttl, system_clock())
    }

    /// Create a store reading time from `clock`.
    #[must_use]
    pub fn with_clock(pool: PgPool, table: &str, default_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            pool,
            table: sanitize_identifier(table, DEFAULT_SESSION_TABLE),
            default_ttl,
            clock,
            ready: Arc::new(OnceCell::new()),
        }
    }

    /// Name of the backing table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Wait until the table and its expiry index exist.
    ///
    /// Runs the DDL once per store; later calls return immediately. A failed
    /// attempt is retried by the next caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::StoreUnavailable` if the DDL fails.
    pub async fn ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| self.ensure_table())
            .await
            .map(|_| ())
    }

    /// Delete `id` only if its row is still expired at `now_ms`.
    ///
    /// A concurrent write that refreshed the deadline keeps its row.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::StoreUnavailable` if the query fails.
    pub async fn remove_if_expired(&self, id: &SessionId, now_ms: i64) -> Result<bool> {
        self.ready().await?;
        let table = &self.table;

        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE session_id = $1 AND expires_at <= $2"
        ))
        .bind(id.as_str())
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ensure_table(&self) -> Result<()> {
        let table = &self.table;

        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {table} (
                session_id VARCHAR(128) NOT NULL PRIMARY KEY,
                expires_at BIGINT NOT NULL,
                data TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_expires_at_idx ON {table} (expires_at)"
        ))
        .execute(&self.pool)
        .await?;

        tracing::info!(table = %table, "Session table ready");
        Ok(())
    }
}

impl std::fmt::Debug for PostgresSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSessionStore")
            .field("table", &self.table)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl SessionStore for PostgresSessionStore {
    async fn read(&self, id: &SessionId) -> Result<Option<SessionData>> {
        self.ready().await?;
        let table = &self.table;

        let row: Option<(String, i64)> = sqlx::query_as(&format!(
            "SELECT data, expires_at FROM {table} WHERE session_id = $1 LIMIT 1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((data, expires_at)) = row else {
            return Ok(None);
        };

        let now_ms = self.clock.now_ms();
        if expires_at <= now_ms {
            if self.remove_if_expired(id, now_ms).await? {
                tracing::debug!(session_id = %id, "Expired session removed on read");
            }
            return Ok(None);
        }

        SessionData::from_json(&data).map(Some)
    }

    async fn write(&self, id: &SessionId, data: &SessionData) -> Result<()> {
        self.ready().await?;
        let table = &self.table;
        let expires_at = data.expiry_ms(self.clock.now_ms(), self.default_ttl);
        let payload = data.to_json()?;

        sqlx::query(&format!(
            r"
            INSERT INTO {table} (session_id, expires_at, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id) DO UPDATE SET
                expires_at = EXCLUDED.expires_at,
                data = EXCLUDED.data,
                updated_at = now()
            "
        ))
        .bind(id.as_str())
        .bind(expires_at)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch(&self, id: &SessionId, data: &SessionData) -> Result<()> {
        self.ready().await?;
        let table = &self.table;
        let expires_at = data.expiry_ms(self.clock.now_ms(), self.default_ttl);

        sqlx::query(&format!(
            "UPDATE {table} SET expires_at = $1, updated_at = now() WHERE session_id = $2"
        ))
        .bind(expires_at)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<()> {
        self.ready().await?;
        let table = &self.table;

        sqlx::query(&format!("DELETE FROM {table} WHERE session_id = $1"))
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.ready().await?;
        let table = &self.table;

        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        self.ready().await?;
        let table = &self.table;

        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete_expired(&self) -> Result<u64> {
        self.ready().await?;
        let table = &self.table;

        let result = sqlx::query(&format!("DELETE FROM {table} WHERE expires_at <= $1"))
            .bind(self.clock.now_ms())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
