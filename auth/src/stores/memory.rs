//! In-memory session store.
//!
//! Process-local fallback used in development and tests. Sessions do not
//! survive a restart and are not shared between instances.

use crate::clock::{SharedClock, system_clock};
use crate::constants::DEFAULT_SESSION_TTL;
use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{SessionData, SessionId, SessionRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// In-memory session store.
#[derive(Clone)]
pub struct MemorySessionStore {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
    default_ttl: Duration,
    clock: SharedClock,
}

impl MemorySessionStore {
    /// Create an empty store with the given default TTL.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, system_clock())
    }

    /// Create an empty store reading time from `clock`.
    #[must_use]
    pub fn with_clock(default_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, SessionRecord>>> {
        self.records
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl SessionStore for MemorySessionStore {
    async fn read(&self, id: &SessionId) -> Result<Option<SessionData>> {
        let now_ms = self.clock.now_ms();
        let mut records = self.lock()?;

        match records.get(id) {
            None => Ok(None),
            Some(record) if record.is_expired(now_ms) => {
                records.remove(id);
                tracing::debug!(session_id = %id, "Expired session removed on read");
                Ok(None)
            }
            Some(record) => Ok(Some(record.data.clone())),
        }
    }

    async fn write(&self, id: &SessionId, data: &SessionData) -> Result<()> {
        let now = self.clock.now();
        let record = SessionRecord {
            id: id.clone(),
            expires_at_ms: data.expiry_ms(now.timestamp_millis(), self.default_ttl),
            data: data.clone(),
            updated_at: now,
        };
        self.lock()?.insert(id.clone(), record);
        Ok(())
    }

    async fn touch(&self, id: &SessionId, data: &SessionData) -> Result<()> {
        let now = self.clock.now();
        if let Some(record) = self.lock()?.get_mut(id) {
            record.expires_at_ms = data.expiry_ms(now.timestamp_millis(), self.default_ttl);
            record.updated_at = now;
        }
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<()> {
        self.lock()?.remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.lock()?.len() as u64)
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now_ms = self.clock.now_ms();
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now_ms));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockClock;

    fn store() -> (MemorySessionStore, MockClock) {
        let clock = MockClock::new();
        let store = MemorySessionStore::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));
        (store, clock)
    }

    #[tokio::test]
    async fn test_write_then_read_returns_payload() {
        let (store, _clock) = store();
        let id = SessionId::generate();
        let mut data = SessionData::default();
        data.insert("theme", "dark").unwrap();

        store.write(&id, &data).await.unwrap();

        assert_eq!(store.read(&id).await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_expired_read_is_absent_and_deletes_row() {
        let (store, clock) = store();
        let id = SessionId::generate();
        store.write(&id, &SessionData::default()).await.unwrap();

        clock.advance(Duration::from_secs(60));

        assert_eq!(store.read(&id).await.unwrap(), None);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_touch_extends_deadline_without_changing_payload() {
        let (store, clock) = store();
        let id = SessionId::generate();
        let mut original = SessionData::default();
        original.insert("step", 1).unwrap();
        store.write(&id, &original).await.unwrap();

        clock.advance(Duration::from_secs(50));
        let mut changed = original.clone();
        changed.insert("step", 2).unwrap();
        store.touch(&id, &changed).await.unwrap();

        clock.advance(Duration::from_secs(50));
        assert_eq!(store.read(&id).await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_touch_unknown_id_is_noop() {
        let (store, _clock) = store();
        store.touch(&SessionId::generate(), &SessionData::default()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_expired_counts_removed_rows() {
        let (store, clock) = store();
        let short = SessionData::with_max_age(Duration::from_secs(10));
        store.write(&SessionId::generate(), &short).await.unwrap();
        store.write(&SessionId::generate(), &short).await.unwrap();
        store.write(&SessionId::generate(), &SessionData::default()).await.unwrap();

        clock.advance(Duration::from_secs(10));

        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.delete_expired().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent_and_clear_empties() {
        let (store, _clock) = store();
        let id = SessionId::generate();
        store.write(&id, &SessionData::default()).await.unwrap();
        store.write(&SessionId::generate(), &SessionData::default()).await.unwrap();

        store.destroy(&id).await.unwrap();
        store.destroy(&id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
