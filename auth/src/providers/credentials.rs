//! Credential lookup trait.
//!
//! The credential table belongs to the host application; the login flow only
//! needs to find a record and replace its stored secret.

use crate::error::Result;
use crate::password::is_adaptive_hash;

/// A stored login credential.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Numeric primary key.
    pub id: i64,
    /// Login name.
    pub identity: String,
    /// Stored secret: an Argon2 PHC string, a bcrypt string, or legacy plaintext.
    pub secret_hash: String,
    /// Human-readable name.
    pub display_name: Option<String>,
}

impl CredentialRecord {
    /// Whether the stored secret is plaintext.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        !is_adaptive_hash(&self.secret_hash)
    }
}

// Never print the stored secret.
impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("secret_hash", &"<redacted>")
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Credential repository.
///
/// # Implementation Notes
///
/// - `find_by_identity` is an exact match on the login name
/// - `update_secret_hash` is only called after a successful legacy login
pub trait CredentialRepository: Send + Sync {
    /// Find a credential by login name.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn find_by_identity(
        &self,
        identity: &str,
    ) -> impl std::future::Future<Output = Result<Option<CredentialRecord>>> + Send;

    /// Replace the stored secret for `identity`.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store is unreachable.
    fn update_secret_hash(
        &self,
        identity: &str,
        new_hash: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
