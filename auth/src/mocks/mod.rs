//! Mock provider implementations for testing.
//!
//! In-memory, deterministic stand-ins for the provider traits. The session
//! and attempt stores need no mock: their in-memory implementations in
//! [`crate::stores`] serve both production fallback and tests.

pub mod clock;
pub mod credentials;

pub use clock::MockClock;
pub use credentials::MockCredentialRepository;
