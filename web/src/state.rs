//! Application state for Axum handlers.

use sessionguard_auth::{LoginService, StoreBackend};
use std::sync::Arc;

/// State shared across all HTTP handlers.
///
/// Generic over the session store `S`, credential repository `R` and
/// attempt store `A` so tests can run the full router in memory.
pub struct AppState<S, R, A> {
    /// Session store (also wrapped by the session layer).
    pub sessions: S,
    /// Login flow with its throttle.
    pub login: Arc<LoginService<R, A>>,
    /// Session backend in use, reported by the health endpoint.
    pub backend: StoreBackend,
}

impl<S, R, A> AppState<S, R, A> {
    /// Create application state.
    #[must_use]
    pub fn new(sessions: S, login: LoginService<R, A>, backend: StoreBackend) -> Self {
        Self {
            sessions,
            login: Arc::new(login),
            backend,
        }
    }
}

// Manual impl: `R` and `A` live behind the `Arc` and need not be `Clone`.
impl<S: Clone, R, A> Clone for AppState<S, R, A> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            login: Arc::clone(&self.login),
            backend: self.backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionguard_auth::mocks::MockCredentialRepository;
    use sessionguard_auth::stores::{MemoryAttemptStore, MemorySessionStore};

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState<MemorySessionStore, MockCredentialRepository, MemoryAttemptStore>>();
    }
}
