//! Provider traits.
//!
//! The session layer depends on three seams, each an async trait so that
//! backends can be swapped without touching request handling:
//!
//! - [`SessionStore`]: TTL-aware key/value storage of session payloads
//! - [`CredentialRepository`]: lookup and rehash of stored login secrets
//! - [`AttemptStore`]: failed-login counters used by the throttle
//!
//! Concrete implementations live in [`crate::stores`]; test doubles in
//! `crate::mocks`.

pub mod attempts;
pub mod credentials;
pub mod session;

pub use attempts::{AttemptStore, LoginAttemptState};
pub use credentials::{CredentialRecord, CredentialRepository};
pub use session::SessionStore;
