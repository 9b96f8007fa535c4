//! Background removal of expired sessions.
//!
//! Reads already treat expired records as absent, so the sweeper only keeps
//! the table from growing. A failed pass is logged and retried on the next tick.
//!
//! # Example
//!
//! ```no_run
//! use sessionguard_auth::stores::MemorySessionStore;
//! use sessionguard_auth::sweeper::ExpirySweeper;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let store = MemorySessionStore::default();
//! let sweeper = ExpirySweeper::start(store, Duration::from_secs(15 * 60));
//!
//! // ... serve requests ...
//!
//! sweeper.stop().await;
//! # }
//! ```

use crate::error::Result;
use crate::providers::SessionStore;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Spawns the expiry loop.
#[derive(Debug, Clone, Copy)]
pub struct ExpirySweeper;

impl ExpirySweeper {
    /// Start sweeping `store` every `interval`.
    ///
    /// The first pass runs one full interval after start. A zero interval
    /// returns an inert handle and spawns nothing.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start<S>(store: S, interval: Duration) -> SweeperHandle
    where
        S: SessionStore + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        if interval.is_zero() {
            tracing::info!("Session sweeper disabled");
            return SweeperHandle {
                shutdown: shutdown_tx,
                task: None,
            };
        }

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_ms = interval.as_millis(), "Session sweeper started");

            while !*shutdown_rx.borrow() {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Errors are logged inside; keep going.
                        let _ = sweep_once(&store).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Session sweeper stopped");
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

/// Run a single sweep pass.
///
/// # Errors
///
/// Returns the store error after logging it.
pub async fn sweep_once<S: SessionStore>(store: &S) -> Result<u64> {
    match store.delete_expired().await {
        Ok(removed) => {
            if removed > 0 {
                tracing::debug!(removed, "Expired sessions swept");
            }
            Ok(removed)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to sweep expired sessions");
            Err(e)
        }
    }
}

/// Handle to a running sweeper.
///
/// Dropping the handle without calling [`stop`](Self::stop) aborts the task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Whether a sweep task was spawned and is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal the loop to exit and wait for it.
    ///
    /// A pass already in flight is allowed to finish.
    pub async fn stop(mut self) {
        self.shutdown.send(true).ok();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Session sweeper task ended abnormally");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockClock;
    use crate::state::{SessionData, SessionId};
    use crate::stores::MemorySessionStore;
    use std::sync::Arc;

    async fn store_with_expired_rows() -> (MemorySessionStore, MockClock) {
        let clock = MockClock::new();
        let store = MemorySessionStore::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));
        store.write(&SessionId::generate(), &SessionData::default()).await.unwrap();
        store.write(&SessionId::generate(), &SessionData::default()).await.unwrap();
        clock.advance(Duration::from_secs(61));
        (store, clock)
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_rows() {
        let (store, _clock) = store_with_expired_rows().await;

        let handle = ExpirySweeper::start(store.clone(), Duration::from_millis(10));
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop().await;

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_interval_spawns_nothing() {
        let (store, _clock) = store_with_expired_rows().await;

        let handle = ExpirySweeper::start(store.clone(), Duration::ZERO);
        assert!(!handle.is_running());
        handle.stop().await;

        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick() {
        let (store, _clock) = store_with_expired_rows().await;

        let handle = ExpirySweeper::start(store.clone(), Duration::from_secs(3600));
        handle.stop().await;

        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sweep_once_reports_removed() {
        let (store, _clock) = store_with_expired_rows().await;
        assert_eq!(sweep_once(&store).await.unwrap(), 2);
        assert_eq!(sweep_once(&store).await.unwrap(), 0);
    }
}
