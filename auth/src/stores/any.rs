//! Runtime-selected session store.

use crate::config::{AuthConfig, StoreBackend};
use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{SessionData, SessionId};
use crate::stores::{MemorySessionStore, PostgresSessionStore};
use sqlx::PgPool;

/// Session store chosen from configuration at startup.
#[derive(Debug, Clone)]
pub enum AnySessionStore {
    /// Process-local store.
    Memory(MemorySessionStore),
    /// Relational store.
    Postgres(PostgresSessionStore),
}

impl AnySessionStore {
    /// Build the configured backend.
    ///
    /// The persistent backend needs `pool` and a table that can be created.
    /// Outside production a missing pool or a failed readiness check logs a
    /// warning and falls back to memory; in production both are fatal.
    ///
    /// # Errors
    ///
    /// In production only:
    /// - No pool for the persistent backend → `AuthError::InvalidConfiguration`
    /// - Table creation failed → `AuthError::StoreUnavailable`
    pub async fn open(config: &AuthConfig, pool: Option<PgPool>) -> Result<Self> {
        let session = &config.session;
        let memory = || Self::Memory(MemorySessionStore::new(session.ttl));

        if session.backend == StoreBackend::Memory {
            tracing::info!("Using in-memory session store");
            return Ok(memory());
        }

        let Some(pool) = pool else {
            if config.production {
                return Err(AuthError::InvalidConfiguration(
                    "DATABASE_URL is required for the persistent session store".to_string(),
                ));
            }
            tracing::warn!("No database configured, falling back to in-memory session store");
            return Ok(memory());
        };

        let store = PostgresSessionStore::new(pool, &session.table, session.ttl);
        match store.ready().await {
            Ok(()) => {
                tracing::info!(table = %store.table(), "Using persistent session store");
                Ok(Self::Postgres(store))
            }
            Err(e) if config.production => {
                tracing::error!(error = %e, "Persistent session store not ready");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Persistent session store not ready, falling back to in-memory store");
                Ok(memory())
            }
        }
    }

    /// Backend actually in use.
    #[must_use]
    pub const fn backend(&self) -> StoreBackend {
        match self {
            Self::Memory(_) => StoreBackend::Memory,
            Self::Postgres(_) => StoreBackend::Persistent,
        }
    }
}

impl From<MemorySessionStore> for AnySessionStore {
    fn from(store: MemorySessionStore) -> Self {
        Self::Memory(store)
    }
}

impl From<PostgresSessionStore> for AnySessionStore {
    fn from(store: PostgresSessionStore) -> Self {
        Self::Postgres(store)
    }
}

impl SessionStore for AnySessionStore {
    async fn read(&self, id: &SessionId) -> Result<Option<SessionData>> {
        match self {
            Self::Memory(store) => store.read(id).await,
            Self::Postgres(store) => store.read(id).await,
        }
    }

    async fn write(&self, id: &SessionId, data: &SessionData) -> Result<()> {
        match self {
            Self::Memory(store) => store.write(id, data).await,
            Self::Postgres(store) => store.write(id, data).await,
        }
    }

    async fn touch(&self, id: &SessionId, data: &SessionData) -> Result<()> {
        match self {
            Self::Memory(store) => store.touch(id, data).await,
            Self::Postgres(store) => store.touch(id, data).await,
        }
    }

    async fn destroy(&self, id: &SessionId) -> Result<()> {
        match self {
            Self::Memory(store) => store.destroy(id).await,
            Self::Postgres(store) => store.destroy(id).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        match self {
            Self::Memory(store) => store.clear().await,
            Self::Postgres(store) => store.clear().await,
        }
    }

    async fn count(&self) -> Result<u64> {
        match self {
            Self::Memory(store) => store.count().await,
            Self::Postgres(store) => store.count().await,
        }
    }

    async fn delete_expired(&self) -> Result<u64> {
        match self {
            Self::Memory(store) => store.delete_expired().await,
            Self::Postgres(store) => store.delete_expired().await,
        }
    }
}
