//! Cookie-backed session middleware.
//!
//! [`SessionLayer`] loads the caller's session before the handler runs and
//! persists it afterwards:
//!
//! 1. **Load** the id from the session cookie and read it from the store
//! 2. **Expose** a [`SessionHandle`] in request extensions
//! 3. **Run** the inner service
//! 4. **Commit**: write if modified (new id when regenerated), destroy and
//!    clear the cookie if destroyed, otherwise touch to extend the deadline
//! 5. **Advertise** the current CSRF token in the `x-csrf-token` header
//!
//! Sessions that are never modified are never stored, so anonymous traffic
//! does not create rows.
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use sessionguard_web::session::{CookieSettings, SessionLayer};
//!
//! let app = Router::new()
//!     .route("/", get(index))
//!     .layer(SessionLayer::new(store, CookieSettings::default()));
//! ```

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use sessionguard_auth::constants::{CSRF_HEADER, DEFAULT_SESSION_TTL, SESSION_COOKIE_NAME};
use sessionguard_auth::{
    AuthError, SessionConfig, SessionData, SessionId, SessionIdentity, SessionStore, csrf,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};

/// Session cookie attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    /// Cookie name.
    pub name: String,
    /// Add the `Secure` attribute.
    pub secure: bool,
    /// Cookie and session lifetime.
    pub max_age: Duration,
}

impl CookieSettings {
    /// Derive cookie settings from session configuration.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.cookie_secure,
            max_age: config.ttl,
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            secure: false,
            max_age: DEFAULT_SESSION_TTL,
        }
    }
}

/// `Set-Cookie` value carrying a session id.
///
/// # Errors
///
/// Returns `AuthError::InternalError` if the cookie name is not a valid header value.
pub fn session_cookie(settings: &CookieSettings, id: &SessionId) -> Result<HeaderValue, AuthError> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        settings.name,
        id.as_str(),
        settings.max_age.as_secs()
    );
    if settings.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| AuthError::InternalError(format!("Invalid session cookie: {e}")))
}

/// `Set-Cookie` value that removes the session cookie.
///
/// # Errors
///
/// Returns `AuthError::InternalError` if the cookie name is not a valid header value.
pub fn clear_session_cookie(settings: &CookieSettings) -> Result<HeaderValue, AuthError> {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", settings.name);
    if settings.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| AuthError::InternalError(format!("Invalid session cookie: {e}")))
}

/// Value of the named cookie from the request's `Cookie` headers.
#[must_use]
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim())
        })
}

#[derive(Debug)]
struct HandleState {
    /// Id the request arrived with, if it matched a live session.
    id: Option<SessionId>,
    data: SessionData,
    modified: bool,
    regenerate: bool,
    destroyed: bool,
}

/// Per-request view of the caller's session.
///
/// Cheap to clone; clones share state. Handlers obtain it as an extractor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<HandleState>>,
}

impl SessionHandle {
    /// Handle over a loaded session, or a fresh one when `loaded` is `None`.
    #[must_use]
    pub fn new(loaded: Option<(SessionId, SessionData)>, max_age: Duration) -> Self {
        let (id, data) = match loaded {
            Some((id, data)) => (Some(id), data),
            None => (None, SessionData::with_max_age(max_age)),
        };
        Self {
            inner: Arc::new(Mutex::new(HandleState {
                id,
                data,
                modified: false,
                regenerate: false,
                destroyed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the request carried a live session.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.lock().id.is_none()
    }

    /// Snapshot of the payload.
    #[must_use]
    pub fn data(&self) -> SessionData {
        self.lock().data.clone()
    }

    /// Logged-in identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<SessionIdentity> {
        self.lock().data.identity.clone()
    }

    /// Read a typed attribute.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lock().data.get(key)
    }

    /// Store a typed attribute.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SerializationError` if `value` cannot be encoded.
    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<(), AuthError> {
        let mut state = self.lock();
        state.data.insert(key, value)?;
        state.modified = true;
        Ok(())
    }

    /// Remove and return a typed attribute.
    pub fn take<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut state = self.lock();
        let value = state.data.remove(key)?;
        state.modified = true;
        serde_json::from_value(value).ok()
    }

    /// Current CSRF token, issuing one if the session has none.
    pub fn csrf_token(&self) -> String {
        let mut state = self.lock();
        if state.data.csrf_token.is_none() {
            state.modified = true;
        }
        csrf::ensure_token(&mut state.data)
    }

    /// Check a submitted CSRF token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CsrfTokenInvalid` on mismatch.
    pub fn verify_csrf(&self, submitted: Option<&str>) -> Result<(), AuthError> {
        csrf::verify(&self.lock().data, submitted)
    }

    /// Mark the caller as logged in.
    ///
    /// Issues a new session id and a new CSRF token, returning the token.
    pub fn login(&self, identity: SessionIdentity) -> String {
        let mut state = self.lock();
        state.data.identity = Some(identity);
        state.modified = true;
        state.regenerate = true;
        csrf::rotate(&mut state.data)
    }

    /// End the session; the row is deleted and the cookie cleared.
    pub fn destroy(&self) {
        self.lock().destroyed = true;
    }

    fn finish(&self) -> HandleState {
        let state = self.lock();
        HandleState {
            id: state.id.clone(),
            data: state.data.clone(),
            modified: state.modified,
            regenerate: state.regenerate,
            destroyed: state.destroyed,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::from(AuthError::SessionUninitialized))
    }
}

/// Layer that attaches a [`SessionHandle`] to every request.
#[derive(Debug, Clone)]
pub struct SessionLayer<St> {
    store: St,
    settings: Arc<CookieSettings>,
}

impl<St> SessionLayer<St> {
    /// Create a session layer over `store`.
    #[must_use]
    pub fn new(store: St, settings: CookieSettings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }
}

impl<St: Clone, S> Layer<S> for SessionLayer<St> {
    type Service = SessionMiddleware<St, S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            store: self.store.clone(),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Middleware service for session loading and persistence.
#[derive(Debug, Clone)]
pub struct SessionMiddleware<St, S> {
    inner: S,
    store: St,
    settings: Arc<CookieSettings>,
}

impl<St, S> Service<Request> for SessionMiddleware<St, S>
where
    St: SessionStore + Clone + 'static,
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        // The ready service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let store = self.store.clone();
        let settings = Arc::clone(&self.settings);

        Box::pin(async move {
            let handle = match load(&store, &settings, req.headers()).await {
                Ok(handle) => handle,
                Err(e) => return Ok(AppError::from(e).into_response()),
            };
            req.extensions_mut().insert(handle.clone());

            let mut response = inner.call(req).await?;

            if let Err(e) = commit(&store, &settings, &handle, &mut response).await {
                return Ok(AppError::from(e).into_response());
            }
            Ok(response)
        })
    }
}

async fn load<St: SessionStore>(
    store: &St,
    settings: &CookieSettings,
    headers: &HeaderMap,
) -> Result<SessionHandle, AuthError> {
    let Some(id) = cookie_value(headers, &settings.name).and_then(SessionId::parse) else {
        return Ok(SessionHandle::new(None, settings.max_age));
    };

    let loaded = store.read(&id).await?.map(|data| (id, data));
    Ok(SessionHandle::new(loaded, settings.max_age))
}

async fn commit<St: SessionStore>(
    store: &St,
    settings: &CookieSettings,
    handle: &SessionHandle,
    response: &mut Response,
) -> Result<(), AuthError> {
    let state = handle.finish();

    if state.destroyed {
        if let Some(id) = &state.id {
            store.destroy(id).await?;
            tracing::debug!(session_id = %id, "Session destroyed");
        }
        response
            .headers_mut()
            .append(header::SET_COOKIE, clear_session_cookie(settings)?);
        return Ok(());
    }

    if state.modified {
        let id = match state.id {
            Some(old) if state.regenerate => {
                store.destroy(&old).await?;
                let fresh = SessionId::generate();
                tracing::debug!(old = %old, new = %fresh, "Session id regenerated");
                fresh
            }
            Some(id) => id,
            None => SessionId::generate(),
        };
        store.write(&id, &state.data).await?;
        response
            .headers_mut()
            .append(header::SET_COOKIE, session_cookie(settings, &id)?);
    } else if let Some(id) = &state.id {
        store.touch(id, &state.data).await?;
    }

    if let Some(token) = state.data.csrf_token.as_deref() {
        if let Ok(value) = HeaderValue::from_str(token) {
            response.headers_mut().insert(CSRF_HEADER, value);
        }
    }

    Ok(())
}
