//! Authentication gate middleware.
//!
//! Protected routes run only for callers whose session holds an identity.
//! Browsers (`Accept: text/html`) are redirected to the login page with a
//! flash warning; API callers get `401`.

use crate::error::AppError;
use crate::WebResult;
use crate::flash;
use crate::session::SessionHandle;
use axum::{
    extract::Request,
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use sessionguard_auth::AuthError;
use sessionguard_auth::gate::{self, GateDecision, LOGIN_PATH};

/// Message flashed to browsers bounced to the login page.
pub const LOGIN_REQUIRED_MESSAGE: &str = "You need to be logged in to access this page.";

/// Let authenticated callers through; redirect or reject everyone else.
///
/// Must run inside [`SessionLayer`](crate::session::SessionLayer).
///
/// # Errors
///
/// - No session on the request → 500
/// - Anonymous API caller → 401
pub async fn require_auth(req: Request, next: Next) -> WebResult<Response> {
    let session = req
        .extensions()
        .get::<SessionHandle>()
        .cloned()
        .ok_or(AuthError::SessionUninitialized)?;

    let data = session.data();
    match gate::decide(Some(&data), wants_html(req.headers())) {
        GateDecision::Allow => Ok(next.run(req).await),
        GateDecision::RedirectToLogin => {
            tracing::debug!(uri = %req.uri(), "Anonymous browser redirected to login");
            flash::push(&session, flash::Level::Warning, LOGIN_REQUIRED_MESSAGE)?;
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        GateDecision::Unauthorized => Err(AppError::unauthorized("Authentication required")),
    }
}

/// Whether the caller asked for an HTML page.
#[must_use]
pub fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_wants_html() {
        let mut headers = HeaderMap::new();
        assert!(!wants_html(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9"),
        );
        assert!(wants_html(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!wants_html(&headers));
    }
}
