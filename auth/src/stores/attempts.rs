//! In-memory login attempt store.

use crate::config::ThrottleConfig;
use crate::error::{AuthError, Result};
use crate::providers::{AttemptStore, LoginAttemptState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Process-local attempt store.
///
/// Counters are lost on restart and are not shared between instances.
#[derive(Debug, Clone, Default)]
pub struct MemoryAttemptStore {
    entries: Arc<Mutex<HashMap<String, LoginAttemptState>>>,
}

impl MemoryAttemptStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether no key is tracked.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, LoginAttemptState>>> {
        self.entries
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
    }
}

impl AttemptStore for MemoryAttemptStore {
    async fn get(&self, key: &str) -> Result<Option<LoginAttemptState>> {
        Ok(self.lock()?.get(key).copied())
    }

    async fn increment_failure(
        &self,
        key: &str,
        now_ms: i64,
        config: ThrottleConfig,
    ) -> Result<LoginAttemptState> {
        let mut entries = self.lock()?;
        let entry = entries.entry(key.to_string()).or_default();
        *entry = entry.after_failure(now_ms, &config);
        Ok(*entry)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_all_counted() {
        let store = MemoryAttemptStore::new();
        let config = ThrottleConfig::new(1_000, Duration::from_secs(600));

        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_failure("alice_1.2.3.4", 0, config).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let entry = store.get("alice_1.2.3.4").await.unwrap().unwrap();
        assert_eq!(entry.failure_count, 200);
        assert_eq!(store.len().unwrap(), 1);
    }
}
