//! # Sessionguard Auth
//!
//! Server-side session state and request authenticity for stateful web
//! applications.
//!
//! ## Features
//!
//! - **Session stores**: TTL-aware, in memory or in `PostgreSQL`
//! - **Expiry sweeper**: background deletion with an explicit start/stop lifecycle
//! - **CSRF guard**: session-bound double-submit tokens, rotated on login
//! - **Login throttle**: per identity+origin lockout after repeated failures
//! - **Credential migration**: legacy plaintext secrets rehashed with Argon2id
//!   on first successful login
//!
//! ## Architecture
//!
//! ```text
//! request ─▶ SessionStore::read ─▶ gate::decide ─▶ csrf::verify ─▶ handler
//!                                                                  │
//!                       login: LoginThrottle ─▶ CredentialRepository
//! ```
//!
//! Storage sits behind the traits in [`providers`]; the HTTP wiring lives in
//! the `sessionguard-web` crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sessionguard_auth::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<()> {
//! let store = stores::MemorySessionStore::new(Duration::from_secs(86_400));
//! let id = SessionId::generate();
//!
//! let mut session = SessionData::default();
//! let token = csrf::ensure_token(&mut session);
//! store.write(&id, &session).await?;
//!
//! let loaded = store.read(&id).await?.unwrap_or_default();
//! csrf::verify(&loaded, Some(&token))?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod clock;
pub mod config;
pub mod constants;
pub mod csrf;
pub mod error;
pub mod gate;
pub mod login;
pub mod password;
pub mod providers;
pub mod state;
pub mod stores;
pub mod sweeper;
pub mod throttle;

// Mock implementations for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use clock::{Clock, SharedClock, SystemClock};
pub use config::{AuthConfig, SessionConfig, StoreBackend, ThrottleConfig};
pub use error::{AuthError, Result};
pub use login::LoginService;
pub use providers::{AttemptStore, CredentialRecord, CredentialRepository, SessionStore};
pub use state::{CookieMeta, SessionData, SessionId, SessionIdentity, SessionRecord};
pub use sweeper::{ExpirySweeper, SweeperHandle};
pub use throttle::{LoginThrottle, ThrottleState};
