//! Login flow: throttle, credential check and legacy secret migration.
//!
//! ```text
//! check(key) ──locked──▶ AccountLocked (credentials untouched)
//!     │
//!     ▼
//! find_by_identity ──none──▶ dummy verify ─▶ record_failure ─▶ InvalidCredentials / AccountLocked
//!     │
//!     ▼
//! plaintext? ──yes──▶ equal? ──yes──────────────▶ rehash + update ─┐
//!     │                                               ▲             ├─▶ record_success ─▶ identity
//!     └──no───▶ argon2/bcrypt verify ──ok── bcrypt? ──┘             │
//!                                              └──argon2────────────┘
//! ```
//!
//! Audit events are emitted on the `audit` tracing target.

use crate::error::{AuthError, Result};
use crate::password::{hash_secret, matches_legacy, needs_rehash, verify_dummy, verify_secret};
use crate::providers::{AttemptStore, CredentialRecord, CredentialRepository};
use crate::state::SessionIdentity;
use crate::throttle::{LoginThrottle, ThrottleState};

/// Authenticates callers against a credential repository.
#[derive(Debug, Clone)]
pub struct LoginService<R, A> {
    credentials: R,
    throttle: LoginThrottle<A>,
}

impl<R, A> LoginService<R, A>
where
    R: CredentialRepository,
    A: AttemptStore,
{
    /// Create a login service.
    #[must_use]
    pub const fn new(credentials: R, throttle: LoginThrottle<A>) -> Self {
        Self {
            credentials,
            throttle,
        }
    }

    /// The throttle guarding this service.
    #[must_use]
    pub const fn throttle(&self) -> &LoginThrottle<A> {
        &self.throttle
    }

    /// Authenticate `identity` with `secret` from `origin` (the caller's IP).
    ///
    /// A matching legacy plaintext or bcrypt secret is replaced by an Argon2id
    /// hash before this returns. An unknown identity still pays for one hash
    /// verification.
    ///
    /// # Errors
    ///
    /// - Key locked, or this failure reached the limit → `AuthError::AccountLocked`
    /// - Unknown identity or wrong secret → `AuthError::InvalidCredentials`
    /// - Credential or attempt store failure → `AuthError::StoreUnavailable`
    pub async fn authenticate(
        &self,
        identity: &str,
        secret: &str,
        origin: &str,
    ) -> Result<SessionIdentity> {
        let key = LoginThrottle::<A>::key(identity, origin);

        if let Err(e) = self.throttle.check(&key).await {
            tracing::warn!(target: "audit", identity = %identity, origin = %origin, "Login rejected: too many attempts");
            return Err(e);
        }

        let record = self.credentials.find_by_identity(identity).await?;
        let verified = match &record {
            Some(record) => self.verify(record, secret).await?,
            None => {
                let secret = secret.to_string();
                tokio::task::spawn_blocking(move || verify_dummy(&secret))
                    .await
                    .map_err(|e| AuthError::InternalError(format!("Hash verification task failed: {e}")))?
            }
        };

        match record {
            Some(record) if verified => {
                self.throttle.record_success(&key).await?;
                tracing::info!(target: "audit", identity = %record.identity, origin = %origin, "Login succeeded");
                Ok(SessionIdentity {
                    id: record.id,
                    identity: record.identity,
                    display_name: record.display_name,
                })
            }
            _ => self.fail(&key, identity, origin).await,
        }
    }

    async fn verify(&self, record: &CredentialRecord, secret: &str) -> Result<bool> {
        let matched = if record.is_legacy() {
            matches_legacy(secret, &record.secret_hash)
        } else {
            let secret = secret.to_string();
            let stored = record.secret_hash.clone();
            tokio::task::spawn_blocking(move || verify_secret(&secret, &stored))
                .await
                .map_err(|e| AuthError::InternalError(format!("Hash verification task failed: {e}")))?
        };

        if matched && needs_rehash(&record.secret_hash) {
            self.rehash(record, secret).await?;
        }
        Ok(matched)
    }

    async fn rehash(&self, record: &CredentialRecord, secret: &str) -> Result<()> {
        let owned = secret.to_string();
        let new_hash = tokio::task::spawn_blocking(move || hash_secret(&owned))
            .await
            .map_err(|e| AuthError::InternalError(format!("Hashing task failed: {e}")))??;

        self.credentials
            .update_secret_hash(&record.identity, &new_hash)
            .await?;
        tracing::info!(target: "audit", identity = %record.identity, "Stored secret migrated to Argon2id");
        Ok(())
    }

    async fn fail(&self, key: &str, identity: &str, origin: &str) -> Result<SessionIdentity> {
        match self.throttle.record_failure(key).await? {
            ThrottleState::Locked { .. } => {
                tracing::warn!(target: "audit", identity = %identity, origin = %origin, "Login locked after repeated failures");
                Err(AuthError::AccountLocked {
                    retry_after: self.throttle.config().lockout_window,
                })
            }
            ThrottleState::Failing(attempts) => {
                tracing::info!(target: "audit", identity = %identity, origin = %origin, attempts, "Login failed");
                Err(AuthError::InvalidCredentials)
            }
            ThrottleState::Clean => Err(AuthError::InvalidCredentials),
        }
    }
}
