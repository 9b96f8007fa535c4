//! Mock credential repository for testing.

use crate::error::{AuthError, Result};
use crate::providers::{CredentialRecord, CredentialRepository};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock credential repository.
///
/// Uses in-memory storage and counts lookups so tests can assert that a
/// locked login never reached the credential store.
#[derive(Debug, Clone, Default)]
pub struct MockCredentialRepository {
    records: Arc<Mutex<HashMap<String, CredentialRecord>>>,
    lookups: Arc<AtomicUsize>,
    updates: Arc<AtomicUsize>,
}

impl MockCredentialRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential with the given stored secret (plaintext or hash).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn insert(&self, id: i64, identity: &str, secret_hash: &str) -> Result<()> {
        self.lock()?.insert(
            identity.to_string(),
            CredentialRecord {
                id,
                identity: identity.to_string(),
                secret_hash: secret_hash.to_string(),
                display_name: Some(format!("{identity} (test)")),
            },
        );
        Ok(())
    }

    /// Currently stored secret for `identity` (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn stored_secret(&self, identity: &str) -> Result<Option<String>> {
        Ok(self
            .lock()?
            .get(identity)
            .map(|record| record.secret_hash.clone()))
    }

    /// Number of `find_by_identity` calls so far.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of `update_secret_hash` calls so far.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CredentialRecord>>> {
        self.records
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
    }
}

impl CredentialRepository for MockCredentialRepository {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<CredentialRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock()?.get(identity).cloned())
    }

    async fn update_secret_hash(&self, identity: &str, new_hash: &str) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if let Some(record) = self.lock()?.get_mut(identity) {
            record.secret_hash = new_hash.to_string();
        }
        Ok(())
    }
}
