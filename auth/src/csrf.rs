//! Double-submit anti-forgery tokens bound to the session.
//!
//! The session carries one token under `csrfToken`. Pages read it and echo it
//! back on state-changing requests (form field `_csrf` or header
//! `x-csrf-token`); [`verify`] accepts only an exact match.
//!
//! # Example
//!
//! ```
//! use sessionguard_auth::csrf;
//! use sessionguard_auth::state::SessionData;
//!
//! let mut session = SessionData::default();
//! let token = csrf::ensure_token(&mut session);
//! assert!(csrf::verify(&session, Some(&token)).is_ok());
//!
//! // After login the old token stops working.
//! let fresh = csrf::rotate(&mut session);
//! assert!(csrf::verify(&session, Some(&token)).is_err());
//! assert!(csrf::verify(&session, Some(&fresh)).is_ok());
//! ```

use crate::constants::TOKEN_BYTES;
use crate::error::{AuthError, Result};
use crate::state::SessionData;
use rand::RngCore;
use rand::rngs::OsRng;

/// Fresh token: 32 random bytes, hex encoded.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Return the session's token, issuing one first if it has none.
pub fn ensure_token(session: &mut SessionData) -> String {
    session
        .csrf_token
        .get_or_insert_with(generate_token)
        .clone()
}

/// Replace the session's token unconditionally.
///
/// Call after every privilege change so a token captured before login cannot
/// be replayed afterwards.
pub fn rotate(session: &mut SessionData) -> String {
    let token = generate_token();
    session.csrf_token = Some(token.clone());
    token
}

/// Check a submitted token against the session's.
///
/// # Errors
///
/// Returns `AuthError::CsrfTokenInvalid` when either side is missing or empty,
/// or the two differ in any byte.
pub fn verify(session: &SessionData, submitted: Option<&str>) -> Result<()> {
    let expected = session.csrf_token.as_deref().filter(|t| !t.is_empty());
    let submitted = submitted.filter(|t| !t.is_empty());

    match (expected, submitted) {
        (Some(expected), Some(submitted))
            if constant_time_eq::constant_time_eq(expected.as_bytes(), submitted.as_bytes()) =>
        {
            Ok(())
        }
        _ => Err(AuthError::CsrfTokenInvalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_ensure_token_is_stable() {
        let mut session = SessionData::default();
        let first = ensure_token(&mut session);
        let second = ensure_token(&mut session);
        assert_eq!(first, second);
        assert_eq!(session.csrf_token.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_missing_tokens_rejected() {
        let mut session = SessionData::default();
        assert_eq!(verify(&session, Some("abc")), Err(AuthError::CsrfTokenInvalid));

        let _ = ensure_token(&mut session);
        assert_eq!(verify(&session, None), Err(AuthError::CsrfTokenInvalid));
        assert_eq!(verify(&session, Some("")), Err(AuthError::CsrfTokenInvalid));
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        let mut session = SessionData::default();
        let token = ensure_token(&mut session);
        assert!(verify(&session, Some(&token[..63])).is_err());
        assert!(verify(&session, Some(&format!("{token}0"))).is_err());
    }

    #[test]
    fn test_rotation_invalidates_previous_token() {
        let mut session = SessionData::default();
        let before = ensure_token(&mut session);
        let after = rotate(&mut session);
        assert_ne!(before, after);
        assert!(verify(&session, Some(&before)).is_err());
        assert!(verify(&session, Some(&after)).is_ok());
    }
}
