//! CSRF verification middleware.
//!
//! Safe methods (`GET`, `HEAD`, `OPTIONS`, `TRACE`) pass through. Every other
//! request must carry the session's token, either in the `x-csrf-token` header
//! or as the `_csrf` field of a url-encoded, multipart or JSON body. On mismatch the
//! handler never runs, files already written for the request are deleted, and
//! the caller gets `403` with code `CSRF_TOKEN_INVALID`.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::post};
//! use sessionguard_web::csrf::require_csrf;
//!
//! let app = Router::new()
//!     .route("/tickets", post(create_ticket))
//!     .route_layer(middleware::from_fn(require_csrf))
//!     .layer(session_layer);
//! ```

use crate::error::AppError;
use crate::WebResult;
use crate::session::SessionHandle;
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use sessionguard_auth::AuthError;
use sessionguard_auth::constants::{CSRF_FORM_FIELD, CSRF_HEADER};
use std::path::PathBuf;

/// Largest body buffered while looking for the form token.
///
/// Multipart uploads above this size must send the token in the header.
pub const FORM_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Temporary files written for the current request (by an upload layer).
///
/// Removed from disk if the request fails the CSRF check.
#[derive(Debug, Clone, Default)]
pub struct UploadedFiles(pub Vec<PathBuf>);

#[derive(Deserialize)]
struct TokenField {
    #[serde(rename = "_csrf")]
    csrf: Option<String>,
}

/// Reject state-changing requests whose CSRF token does not match the session.
///
/// Must run inside [`SessionLayer`](crate::session::SessionLayer).
///
/// # Errors
///
/// - No session on the request → 500 (`AuthError::SessionUninitialized`)
/// - Token missing or different → 403 (`AuthError::CsrfTokenInvalid`)
/// - Body over [`FORM_BODY_LIMIT`] → 413
pub async fn require_csrf(req: Request, next: Next) -> WebResult<Response> {
    if is_safe(req.method()) {
        return Ok(next.run(req).await);
    }

    let session = req
        .extensions()
        .get::<SessionHandle>()
        .cloned()
        .ok_or(AuthError::SessionUninitialized)?;

    let (req, submitted) = submitted_token(req).await?;

    if let Err(e) = session.verify_csrf(submitted.as_deref()) {
        let uploads = req.extensions().get::<UploadedFiles>().cloned();
        tracing::warn!(
            method = %req.method(),
            uri = %req.uri(),
            token_present = submitted.is_some(),
            "CSRF token rejected"
        );
        metrics::counter!("sessionguard.csrf.rejected").increment(1);
        if let Some(UploadedFiles(paths)) = uploads {
            remove_uploads(&paths).await;
        }
        return Err(e.into());
    }

    Ok(next.run(req).await)
}

const fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Pull the token from the header, or from the body for form, multipart and
/// JSON posts.
///
/// Buffered bodies are put back so the handler can still read them.
async fn submitted_token(req: Request) -> WebResult<(Request, Option<String>)> {
    if let Some(token) = header_token(req.headers()) {
        return Ok((req, Some(token)));
    }

    let kind = BodyKind::of(req.headers());
    if kind == BodyKind::Other {
        return Ok((req, None));
    }

    let (parts, body) = req.into_parts();
    let bytes: Bytes = axum::body::to_bytes(body, FORM_BODY_LIMIT)
        .await
        .map_err(|_| AppError::payload_too_large("Request body too large"))?;

    let field = match kind {
        BodyKind::Form => serde_urlencoded::from_bytes::<TokenField>(&bytes).ok(),
        BodyKind::Json => serde_json::from_slice::<TokenField>(&bytes).ok(),
        BodyKind::Multipart => Some(TokenField {
            csrf: multipart_token(&parts.headers, bytes.clone()).await,
        }),
        BodyKind::Other => None,
    };

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok((req, field.and_then(|f| f.csrf)))
}

// Parses a copy of the buffered body; the first `_csrf` part wins.
async fn multipart_token(headers: &HeaderMap, bytes: Bytes) -> Option<String> {
    let mut scratch = Request::new(Body::from(bytes));
    *scratch.headers_mut() = headers.clone();

    let mut multipart = Multipart::from_request(scratch, &()).await.ok()?;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some(CSRF_FORM_FIELD) {
            return field.text().await.ok();
        }
    }
    None
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Form,
    Multipart,
    Json,
    Other,
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            Self::Form
        } else if content_type.starts_with("multipart/form-data") {
            Self::Multipart
        } else if content_type.starts_with("application/json") {
            Self::Json
        } else {
            Self::Other
        }
    }
}

// Cleanup failures are logged and never replace the 403.
async fn remove_uploads(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed upload after CSRF rejection"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload");
            }
        }
    }
}
