//! Adaptive secret hashing.
//!
//! Stored secrets are Argon2 PHC strings (`$argon2id$v=19$...`), bcrypt
//! strings (`$2b$12$...`) or legacy plaintext awaiting migration. New hashes
//! are always Argon2id. These functions are CPU-bound; async callers should
//! run them on a blocking thread.

use crate::error::{AuthError, Result};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::sync::OnceLock;

/// PHC prefix shared by every Argon2 variant.
pub const ADAPTIVE_HASH_PREFIX: &str = "$argon2";

/// Modular-crypt prefixes of the bcrypt variants.
pub const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// How a stored secret is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    /// Argon2 PHC string. The scheme new hashes are written in.
    Argon2,
    /// bcrypt modular-crypt string.
    Bcrypt,
    /// Legacy plaintext.
    Plaintext,
}

impl HashScheme {
    /// Classify a stored secret by its prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sessionguard_auth::password::HashScheme;
    /// assert_eq!(HashScheme::of("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"), HashScheme::Argon2);
    /// assert_eq!(HashScheme::of("$2b$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW"), HashScheme::Bcrypt);
    /// assert_eq!(HashScheme::of("hunter2"), HashScheme::Plaintext);
    /// ```
    #[must_use]
    pub fn of(stored: &str) -> Self {
        if stored.starts_with(ADAPTIVE_HASH_PREFIX) {
            Self::Argon2
        } else if BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p)) {
            Self::Bcrypt
        } else {
            Self::Plaintext
        }
    }
}

/// Whether a stored secret is an adaptive hash of any supported scheme.
///
/// # Examples
///
/// ```
/// # use sessionguard_auth::password::is_adaptive_hash;
/// assert!(is_adaptive_hash("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"));
/// assert!(is_adaptive_hash("$2y$10$abcdefghijklmnopqrstuu"));
/// assert!(!is_adaptive_hash("hunter2"));
/// ```
#[must_use]
pub fn is_adaptive_hash(stored: &str) -> bool {
    HashScheme::of(stored) != HashScheme::Plaintext
}

/// Whether a stored secret should be rewritten as Argon2id after a
/// successful login.
#[must_use]
pub fn needs_rehash(stored: &str) -> bool {
    HashScheme::of(stored) != HashScheme::Argon2
}

/// Hash a secret with Argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::InternalError` if hashing fails.
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::InternalError(format!("Failed to hash secret: {e}")))
}

/// Check a secret against a stored Argon2 or bcrypt hash.
///
/// A malformed stored hash is treated as a mismatch and logged. Plaintext
/// never verifies here; use [`matches_legacy`].
#[must_use]
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    match HashScheme::of(stored) {
        HashScheme::Argon2 => verify_argon2(secret, stored),
        HashScheme::Bcrypt => verify_bcrypt(secret, stored),
        HashScheme::Plaintext => false,
    }
}

/// Burn one Argon2 verification against a fixed hash.
///
/// Used when the identity is unknown so the miss costs as much as a wrong
/// secret. Always returns `false`.
#[must_use]
pub fn verify_dummy(secret: &str) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    match DUMMY_HASH.get_or_init(|| hash_secret("sessionguard-dummy-secret").ok()) {
        Some(hash) => {
            let _ = verify_argon2(secret, hash);
        }
        None => tracing::warn!("Dummy hash unavailable; unknown identities are not padded"),
    }
    false
}

fn verify_bcrypt(secret: &str, stored: &str) -> bool {
    match bcrypt::verify(secret, stored) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored bcrypt hash is malformed");
            false
        }
    }
}

fn verify_argon2(secret: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored secret hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Compare a secret with a legacy plaintext value.
#[must_use]
pub fn matches_legacy(secret: &str, stored: &str) -> bool {
    constant_time_eq::constant_time_eq(secret.as_bytes(), stored.as_bytes())
}
