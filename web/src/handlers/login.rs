//! Login endpoints.
//!
//! Browsers post a url-encoded form and are redirected; API clients post
//! JSON and get JSON back. Both go through the CSRF check, the login
//! throttle and the credential store, and a successful login regenerates
//! the session id and CSRF token.

use crate::error::AppError;
use crate::WebResult;
use crate::extractors::{Authenticated, ClientIp, CsrfToken, UserAgent};
use crate::flash::{self, Messages};
use crate::gate::wants_html;
use crate::session::SessionHandle;
use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use sessionguard_auth::gate::LOGIN_PATH;
use sessionguard_auth::{AttemptStore, CredentialRepository, SessionIdentity};

/// Where browsers land after logging in.
pub const HOME_PATH: &str = "/me";

/// Login form or JSON body.
///
/// Accepts `username`/`password` as aliases so plain HTML forms work as-is.
#[derive(Deserialize)]
pub struct LoginRequest {
    /// Login name.
    #[serde(alias = "username")]
    pub identity: String,
    /// Submitted secret.
    #[serde(alias = "password")]
    pub secret: String,
}

// Never log the secret.
impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Data a login page needs to render.
#[derive(Debug, Serialize)]
pub struct LoginPage {
    /// Token to embed as the `_csrf` form field.
    pub csrf_token: String,
    /// Whether the caller is already logged in.
    pub authenticated: bool,
    /// Pending flash messages, consumed by this view.
    pub messages: Messages,
}

/// Successful JSON login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Logged-in caller.
    pub identity: SessionIdentity,
    /// Token to use for subsequent state-changing requests.
    pub csrf_token: String,
}

/// Render the login page data.
///
/// # Endpoint
///
/// ```text
/// GET /login
/// ```
#[allow(clippy::unused_async)]
pub async fn login_form(session: SessionHandle, CsrfToken(csrf_token): CsrfToken) -> Json<LoginPage> {
    Json(LoginPage {
        csrf_token,
        authenticated: session.identity().is_some(),
        messages: flash::take(&session),
    })
}

/// Check credentials and log the caller in.
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/x-www-form-urlencoded | application/json
/// ```
///
/// # Errors
///
/// For JSON callers:
/// - Malformed body → 400
/// - Wrong credentials or too many attempts → 401 (same message)
/// - Store failure → 500
///
/// Browsers get a redirect back to the login page with a flash message
/// instead of a 401.
pub async fn login_submit<S, R, A>(
    State(state): State<AppState<S, R, A>>,
    session: SessionHandle,
    ClientIp(client_ip): ClientIp,
    UserAgent(user_agent): UserAgent,
    headers: HeaderMap,
    body: Bytes,
) -> WebResult<Response>
where
    S: Clone,
    R: CredentialRepository,
    A: AttemptStore,
{
    let html = wants_html(&headers) || is_form(&headers);
    let request = parse_request(&headers, &body)?;
    let origin = client_ip.to_string();

    match state
        .login
        .authenticate(&request.identity, &request.secret, &origin)
        .await
    {
        Ok(identity) => {
            tracing::info!(
                target: "audit",
                identity = %identity.identity,
                client_ip = %client_ip,
                user_agent = %user_agent,
                "Session established"
            );
            metrics::counter!("sessionguard.login.succeeded").increment(1);
            let csrf_token = session.login(identity.clone());

            if html {
                Ok(Redirect::to(HOME_PATH).into_response())
            } else {
                Ok(Json(LoginResponse {
                    identity,
                    csrf_token,
                })
                .into_response())
            }
        }
        Err(e) if e.is_login_failure() => {
            metrics::counter!("sessionguard.login.failed").increment(1);
            if html {
                flash::push(&session, flash::Level::Error, e.public_message())?;
                Ok(Redirect::to(LOGIN_PATH).into_response())
            } else {
                Err(e.into())
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// The logged-in caller.
///
/// # Endpoint
///
/// ```text
/// GET /me
/// ```
#[allow(clippy::unused_async)]
pub async fn me(Authenticated(identity): Authenticated) -> Json<SessionIdentity> {
    Json(identity)
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

fn parse_request(headers: &HeaderMap, body: &[u8]) -> WebResult<LoginRequest> {
    let parsed = if is_form(headers) {
        serde_urlencoded::from_bytes::<LoginRequest>(body).map_err(|e| e.to_string())
    } else {
        serde_json::from_slice::<LoginRequest>(body).map_err(|e| e.to_string())
    };

    let request = parsed.map_err(|e| {
        tracing::debug!(error = %e, "Malformed login body");
        AppError::bad_request("Username and password are required")
    })?;

    if request.identity.trim().is_empty() || request.secret.is_empty() {
        return Err(AppError::bad_request("Username and password are required"));
    }
    Ok(request)
}
