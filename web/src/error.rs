//! Error types for web handlers.
//!
//! [`AppError`] bridges [`AuthError`] and HTTP: every failure leaves the
//! service as a JSON body `{ "code": ..., "message": ... }` with a matching
//! status. Internal details are logged, never sent.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sessionguard_auth::AuthError;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(session: SessionHandle) -> Result<Json<Data>, AppError> {
///     let identity = session.identity().ok_or_else(|| AppError::unauthorized("Login required"))?;
///     Ok(Json(load(identity)))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 413 Payload Too Large error.
    #[must_use]
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            message.into(),
            "PAYLOAD_TOO_LARGE".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

/// Map auth failures onto HTTP.
///
/// Caller errors become 4xx with the public message. Everything else is a 500
/// carrying the original error for the log. Lockout and bad credentials share
/// status, code and message.
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.public_message();
        if !err.is_user_error() {
            return Self::internal(message).with_source(anyhow::Error::new(err));
        }

        match err {
            AuthError::CsrfTokenInvalid => Self {
                code: "CSRF_TOKEN_INVALID".to_string(),
                ..Self::forbidden(message)
            },
            _ => Self::new(
                StatusCode::UNAUTHORIZED,
                message.to_string(),
                "INVALID_CREDENTIALS".to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn test_csrf_maps_to_forbidden() {
        let err = AppError::from(AuthError::CsrfTokenInvalid);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "CSRF_TOKEN_INVALID");
    }

    #[test]
    fn test_lockout_looks_like_bad_credentials() {
        let locked = AppError::from(AuthError::AccountLocked {
            retry_after: Duration::from_secs(600),
        });
        let invalid = AppError::from(AuthError::InvalidCredentials);
        assert_eq!(locked.status(), invalid.status());
        assert_eq!(locked.to_string(), invalid.to_string());
    }

    #[test]
    fn test_every_auth_error_lands_in_its_class() {
        let errors = [
            AuthError::CsrfTokenInvalid,
            AuthError::InvalidCredentials,
            AuthError::AccountLocked { retry_after: Duration::ZERO },
            AuthError::SessionUninitialized,
            AuthError::StoreUnavailable("down".to_string()),
            AuthError::SerializationError("bad".to_string()),
            AuthError::InvalidConfiguration("bad".to_string()),
            AuthError::InternalError("bug".to_string()),
        ];
        for err in errors {
            let user_error = err.is_user_error();
            let app = AppError::from(err);
            assert_eq!(app.status().is_client_error(), user_error, "{app}");
            assert_eq!(std::error::Error::source(&app).is_none(), user_error, "{app}");
        }
    }

    #[test]
    fn test_forbidden_helper() {
        let err = AppError::forbidden("No");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn test_store_failure_hides_detail() {
        let err = AppError::from(AuthError::StoreUnavailable("password=hunter2".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("hunter2"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
