//! Failed-login throttling per identity and origin.
//!
//! Each `identity_origin` key moves through three states:
//!
//! ```text
//!            failure (n < max)          failure (n = max)
//!   CLEAN ─────────────────────▶ FAILING(n) ─────────────────▶ LOCKED(until)
//!     ▲                              │                              │
//!     └──────── success ─────────────┘◀── attempt after `until` ────┘
//! ```
//!
//! While locked, attempts are rejected before credentials are looked at.

use crate::clock::{SharedClock, system_clock};
use crate::config::ThrottleConfig;
use crate::error::{AuthError, Result};
use crate::providers::{AttemptStore, LoginAttemptState};
use std::time::Duration;

/// Observable throttle state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    /// No recent failures.
    Clean,
    /// Some failures, below the limit.
    Failing(u32),
    /// Rejecting attempts until the given epoch milliseconds.
    Locked {
        /// Lock deadline (epoch ms).
        until_ms: i64,
    },
}

/// Login throttle.
#[derive(Clone)]
pub struct LoginThrottle<A> {
    store: A,
    config: ThrottleConfig,
    clock: SharedClock,
}

impl<A: AttemptStore> LoginThrottle<A> {
    /// Create a throttle over `store` using wall-clock time.
    #[must_use]
    pub fn new(store: A, config: ThrottleConfig) -> Self {
        Self::with_clock(store, config, system_clock())
    }

    /// Create a throttle reading time from `clock`.
    #[must_use]
    pub fn with_clock(store: A, config: ThrottleConfig, clock: SharedClock) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Throttle key for an identity and caller origin.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sessionguard_auth::stores::MemoryAttemptStore;
    /// # use sessionguard_auth::throttle::LoginThrottle;
    /// assert_eq!(LoginThrottle::<MemoryAttemptStore>::key("alice", "1.2.3.4"), "alice_1.2.3.4");
    /// ```
    #[must_use]
    pub fn key(identity: &str, origin: &str) -> String {
        format!("{identity}_{origin}")
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Gate an attempt.
    ///
    /// An elapsed lock is cleared here, so the attempt proceeds from a clean
    /// state.
    ///
    /// # Errors
    ///
    /// - Key still locked → `AuthError::AccountLocked`
    /// - Attempt store failure
    pub async fn check(&self, key: &str) -> Result<()> {
        let Some(entry) = self.store.get(key).await? else {
            return Ok(());
        };
        let Some(until_ms) = entry.locked_until_ms else {
            return Ok(());
        };

        let now_ms = self.clock.now_ms();
        if now_ms < until_ms {
            let remaining = u64::try_from(until_ms - now_ms).unwrap_or(0);
            tracing::warn!(key = %key, "Login attempt rejected: key locked");
            return Err(AuthError::AccountLocked {
                retry_after: Duration::from_millis(remaining),
            });
        }

        self.store.remove(key).await?;
        tracing::debug!(key = %key, "Login lock expired");
        Ok(())
    }

    /// Count a failed attempt, locking the key once the limit is reached.
    ///
    /// # Errors
    ///
    /// Returns error if the attempt store fails.
    pub async fn record_failure(&self, key: &str) -> Result<ThrottleState> {
        let now_ms = self.clock.now_ms();
        let entry = self
            .store
            .increment_failure(key, now_ms, self.config)
            .await?;

        Ok(match entry.locked_until_ms {
            Some(until_ms) => {
                tracing::warn!(key = %key, attempts = entry.failure_count, "Login key locked");
                ThrottleState::Locked { until_ms }
            }
            None => {
                tracing::debug!(key = %key, attempts = entry.failure_count, "Login failure recorded");
                ThrottleState::Failing(entry.failure_count)
            }
        })
    }

    /// Forget all failures for the key.
    ///
    /// # Errors
    ///
    /// Returns error if the attempt store fails.
    pub async fn record_success(&self, key: &str) -> Result<()> {
        self.store.remove(key).await
    }

    /// Current state of the key.
    ///
    /// An elapsed lock reads as [`ThrottleState::Clean`].
    ///
    /// # Errors
    ///
    /// Returns error if the attempt store fails.
    pub async fn state(&self, key: &str) -> Result<ThrottleState> {
        let now_ms = self.clock.now_ms();
        Ok(match self.store.get(key).await? {
            None => ThrottleState::Clean,
            Some(LoginAttemptState {
                locked_until_ms: Some(until_ms),
                ..
            }) if until_ms > now_ms => ThrottleState::Locked { until_ms },
            Some(LoginAttemptState {
                locked_until_ms: Some(_),
                ..
            }) => ThrottleState::Clean,
            Some(LoginAttemptState { failure_count, .. }) if failure_count > 0 => {
                ThrottleState::Failing(failure_count)
            }
            Some(_) => ThrottleState::Clean,
        })
    }
}

impl<A> std::fmt::Debug for LoginThrottle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginThrottle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
