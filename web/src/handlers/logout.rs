//! Logout endpoint.

use crate::gate::wants_html;
use crate::session::SessionHandle;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use sessionguard_auth::gate::LOGIN_PATH;

/// End the caller's session.
///
/// The session row is deleted and the cookie cleared by the session layer.
/// Browsers are sent back to the login page; API clients get `204`.
///
/// # Endpoint
///
/// ```text
/// POST /logout
/// ```
#[allow(clippy::unused_async)]
pub async fn logout(session: SessionHandle, headers: HeaderMap) -> Response {
    if let Some(identity) = session.identity() {
        tracing::info!(target: "audit", identity = %identity.identity, "Session ended");
    }
    session.destroy();

    if wants_html(&headers) {
        Redirect::to(LOGIN_PATH).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}
