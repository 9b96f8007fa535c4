//! Error types for session, CSRF and login operations.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Generic message shown to callers for every failed login.
///
/// Unknown identities, wrong secrets and locked keys all surface with this
/// exact text so a caller cannot test for account existence or lock state.
pub const LOGIN_FAILED_MESSAGE: &str = "Invalid username or password.";

/// Message shown when a state-changing request fails the CSRF check.
pub const CSRF_RETRY_MESSAGE: &str =
    "Session expired or security token invalid. Please try again.";

/// Error taxonomy for the session and request-authenticity layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Request Errors
    // ═══════════════════════════════════════════════════════════

    /// No session context is attached to a request that requires one.
    #[error("Session not initialized for this request")]
    SessionUninitialized,

    /// The anti-forgery token is missing or does not match the session.
    #[error("Invalid CSRF token")]
    CsrfTokenInvalid,

    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// Unknown identity or failed secret check.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts for this identity and origin.
    #[error("Too many attempts, please retry after {retry_after:?}")]
    AccountLocked {
        /// Time remaining until the lock window elapses
        retry_after: Duration,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Backing store unreachable or a query failed.
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    /// Payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration value rejected at startup.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns `true` if this error is caused by the caller rather than the system.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sessionguard_auth::AuthError;
    /// assert!(AuthError::CsrfTokenInvalid.is_user_error());
    /// assert!(!AuthError::StoreUnavailable("down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::CsrfTokenInvalid | Self::InvalidCredentials | Self::AccountLocked { .. }
        )
    }

    /// Returns `true` for failures that count as a rejected login.
    #[must_use]
    pub const fn is_login_failure(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::AccountLocked { .. })
    }

    /// Message safe to show to the end user.
    ///
    /// Lockout is deliberately indistinguishable from a wrong secret.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sessionguard_auth::AuthError;
    /// # use std::time::Duration;
    /// let locked = AuthError::AccountLocked { retry_after: Duration::from_secs(60) };
    /// assert_eq!(locked.public_message(), AuthError::InvalidCredentials.public_message());
    /// ```
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials | Self::AccountLocked { .. } => LOGIN_FAILED_MESSAGE,
            Self::CsrfTokenInvalid => CSRF_RETRY_MESSAGE,
            Self::SessionUninitialized
            | Self::StoreUnavailable(_)
            | Self::SerializationError(_)
            | Self::InvalidConfiguration(_)
            | Self::InternalError(_) => "An internal error occurred.",
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
