//! Session store trait.

use crate::error::Result;
use crate::state::{SessionData, SessionId};

/// Session store.
///
/// Abstracts over where session payloads live (process memory or a relational
/// table).
///
/// # Implementation Notes
///
/// - A record whose deadline is at or before "now" is logically absent; `read`
///   must never return it and should delete it on the way out.
/// - Expiry comes from the payload's cookie metadata, falling back to the
///   store's default TTL (see [`SessionData::expiry_ms`]).
/// - Writes to one id never affect another; concurrent writes to the same id
///   are last-write-wins.
pub trait SessionStore: Send + Sync {
    /// Load a live session.
    ///
    /// # Returns
    ///
    /// `None` if the id is unknown or its record has expired.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Storage is unreachable → `AuthError::StoreUnavailable`
    /// - The stored payload cannot be decoded → `AuthError::SerializationError`
    fn read(
        &self,
        id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Option<SessionData>>> + Send;

    /// Create or replace a session, recomputing its deadline.
    ///
    /// # Errors
    ///
    /// Returns error if storage is unreachable or the payload cannot be encoded.
    fn write(
        &self,
        id: &SessionId,
        data: &SessionData,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Refresh the deadline of an existing session without rewriting its
    /// payload. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if storage is unreachable.
    fn touch(
        &self,
        id: &SessionId,
        data: &SessionData,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete a session. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns error if storage is unreachable.
    fn destroy(&self, id: &SessionId) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete every session.
    ///
    /// # Errors
    ///
    /// Returns error if storage is unreachable.
    fn clear(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Number of stored records, including expired ones not yet swept.
    ///
    /// # Errors
    ///
    /// Returns error if storage is unreachable.
    fn count(&self) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Physically delete every expired record.
    ///
    /// # Returns
    ///
    /// Number of records removed.
    ///
    /// # Errors
    ///
    /// Returns error if storage is unreachable.
    fn delete_expired(&self) -> impl std::future::Future<Output = Result<u64>> + Send;
}
