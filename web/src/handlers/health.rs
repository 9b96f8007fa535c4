//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sessionguard_auth::SessionStore;

/// Simple health check endpoint (for basic liveness).
///
/// Does NOT check the session store.
///
/// # Endpoint
///
/// ```text
/// GET /health/live
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness report.
#[derive(Debug, Serialize)]
pub struct Readiness {
    /// `ok` or `unavailable`.
    pub status: &'static str,
    /// Session backend in use.
    pub backend: &'static str,
    /// Stored sessions, including expired rows not yet swept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<u64>,
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
}

/// Health check against the session store (for readiness).
///
/// # Status Codes
///
/// - 200 OK: store answered
/// - 503 Service Unavailable: store failed
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "backend": "memory",
///   "sessions": 3,
///   "checked_at": "2024-01-01T00:00:00Z"
/// }
/// ```
pub async fn readiness<S, R, A>(
    State(state): State<AppState<S, R, A>>,
) -> (StatusCode, Json<Readiness>)
where
    S: SessionStore + Clone,
{
    let checked_at = Utc::now();
    let backend = state.backend.as_str();

    match state.sessions.count().await {
        Ok(sessions) => (
            StatusCode::OK,
            Json(Readiness {
                status: "ok",
                backend,
                sessions: Some(sessions),
                checked_at,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, backend, "Session store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "unavailable",
                    backend,
                    sessions: None,
                    checked_at,
                }),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sessionguard_auth::constants::DEFAULT_SESSION_TTL;
    use sessionguard_auth::mocks::MockCredentialRepository;
    use sessionguard_auth::stores::{MemoryAttemptStore, MemorySessionStore};
    use sessionguard_auth::{
        LoginService, LoginThrottle, SessionData, SessionId, StoreBackend, ThrottleConfig,
    };

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_readiness_reports_session_count() {
        let sessions = MemorySessionStore::new(DEFAULT_SESSION_TTL);
        sessions
            .write(&SessionId::generate(), &SessionData::default())
            .await
            .unwrap();
        let login = LoginService::new(
            MockCredentialRepository::new(),
            LoginThrottle::new(MemoryAttemptStore::new(), ThrottleConfig::default()),
        );
        let state = AppState::new(sessions, login, StoreBackend::Memory);

        let (status, Json(report)) = readiness(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, "ok");
        assert_eq!(report.backend, "memory");
        assert_eq!(report.sessions, Some(1));
    }
}
