//! Axum integration for sessionguard.
//!
//! Wires the `sessionguard-auth` building blocks into HTTP:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ TraceLayer                                   │
//! │  SessionLayer      ← load / commit session   │
//! │   require_csrf     ← state-changing routes   │
//! │   require_auth     ← protected routes        │
//! │    handler                                   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sessionguard_web::{AppState, CookieSettings, TrustProxy, build_router};
//!
//! let state = AppState::new(sessions, login_service, backend);
//! let app = build_router(state, CookieSettings::from_config(&config.session), TrustProxy(false));
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod csrf;
pub mod error;
pub mod extractors;
pub mod flash;
pub mod gate;
pub mod handlers;
pub mod router;
pub mod session;
pub mod state;

// Re-export key types for convenience
pub use config::ServerConfig;
pub use error::AppError;
pub use extractors::{Authenticated, ClientIp, CsrfToken, TrustProxy, UserAgent};
pub use router::build_router;
pub use session::{CookieSettings, SessionHandle, SessionLayer};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
