//! Route table.
//!
//! | Method | Path | Guards |
//! |--------|------|--------|
//! | GET | `/health` | none |
//! | GET | `/health/live` | none |
//! | GET | `/login` | none |
//! | POST | `/login` | CSRF |
//! | POST | `/logout` | CSRF |
//! | GET | `/me` | auth gate |
//!
//! Every route runs inside the session layer.

use crate::csrf::require_csrf;
use crate::extractors::TrustProxy;
use crate::gate::require_auth;
use crate::handlers::{health_check, login_form, login_submit, logout, me, readiness};
use crate::session::{CookieSettings, SessionLayer};
use crate::state::AppState;
use axum::{
    Extension, Router, middleware,
    routing::{get, post},
};
use sessionguard_auth::{AttemptStore, CredentialRepository, SessionStore};
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn build_router<S, R, A>(
    state: AppState<S, R, A>,
    cookies: CookieSettings,
    trust_proxy: TrustProxy,
) -> Router
where
    S: SessionStore + Clone + 'static,
    R: CredentialRepository + 'static,
    A: AttemptStore + 'static,
{
    let guarded_forms = Router::new()
        .route("/login", get(login_form).post(login_submit::<S, R, A>))
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn(require_csrf));

    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/health", get(readiness::<S, R, A>))
        .route("/health/live", get(health_check))
        .merge(guarded_forms)
        .merge(protected)
        .layer(SessionLayer::new(state.sessions.clone(), cookies))
        .layer(Extension(trust_proxy))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
