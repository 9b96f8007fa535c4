//! Login attempt storage trait.

use crate::config::ThrottleConfig;
use crate::error::Result;

/// Failed-attempt counter for one `identity_origin` key.
///
/// A key with no entry is clean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginAttemptState {
    /// Consecutive failures since the last success or unlock.
    pub failure_count: u32,
    /// Epoch milliseconds until which the key is locked.
    pub locked_until_ms: Option<i64>,
}

impl LoginAttemptState {
    /// State after one more failed attempt at `now_ms`.
    ///
    /// An elapsed lock restarts the count. Reaching `max_attempts` locks the
    /// key for `lockout_window`; an active lock keeps its deadline.
    #[must_use]
    pub fn after_failure(self, now_ms: i64, config: &ThrottleConfig) -> Self {
        let mut next = match self.locked_until_ms {
            Some(until_ms) if until_ms <= now_ms => Self::default(),
            _ => self,
        };

        next.failure_count = next.failure_count.saturating_add(1);
        if next.failure_count >= config.max_attempts && next.locked_until_ms.is_none() {
            let window_ms = i64::try_from(config.lockout_window.as_millis()).unwrap_or(i64::MAX);
            next.locked_until_ms = Some(now_ms.saturating_add(window_ms));
        }
        next
    }
}

/// Attempt store.
///
/// The default [`MemoryAttemptStore`](crate::stores::MemoryAttemptStore) is
/// process-local: every server instance throttles independently and a restart
/// forgets all counters. Inject a shared implementation to throttle across
/// instances.
pub trait AttemptStore: Send + Sync {
    /// Current state for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<LoginAttemptState>>> + Send;

    /// Record one failed attempt and return the resulting state.
    ///
    /// Must apply [`LoginAttemptState::after_failure`] atomically per key:
    /// concurrent failures for the same key may not lose increments.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn increment_failure(
        &self,
        key: &str,
        now_ms: i64,
        config: ThrottleConfig,
    ) -> impl std::future::Future<Output = Result<LoginAttemptState>> + Send;

    /// Forget `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn remove(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
