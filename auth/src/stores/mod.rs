//! Storage implementations.
//!
//! - **Session stores**: [`MemorySessionStore`] (process-local) and
//!   [`PostgresSessionStore`] (shared table), unified by [`AnySessionStore`]
//! - **Credential repository**: [`PostgresCredentialRepository`]
//! - **Attempt store**: [`MemoryAttemptStore`]

pub mod any;
pub mod attempts;
pub mod credentials_postgres;
pub mod memory;
pub mod postgres;

// Re-exports
pub use any::AnySessionStore;
pub use attempts::MemoryAttemptStore;
pub use credentials_postgres::PostgresCredentialRepository;
pub use memory::MemorySessionStore;
pub use postgres::PostgresSessionStore;
