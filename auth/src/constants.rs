//! Protocol constants shared by the auth and web layers.

use std::time::Duration;

/// Session payload key holding the anti-forgery token.
pub const CSRF_SESSION_KEY: &str = "csrfToken";

/// Form field carrying the caller's anti-forgery token.
pub const CSRF_FORM_FIELD: &str = "_csrf";

/// Header carrying the anti-forgery token, in requests and responses.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Default name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "sid";

/// Table used by the persistent session store when none is configured.
pub const DEFAULT_SESSION_TABLE: &str = "user_sessions";

/// Default session lifetime (24 hours).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default interval between expiry sweeps (15 minutes).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Failed attempts allowed before an identity/origin pair is locked.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// How long a locked identity/origin pair stays locked (10 minutes).
pub const DEFAULT_LOCKOUT_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Random bytes behind every session id and CSRF token (256 bits).
pub const TOKEN_BYTES: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_SESSION_TTL.as_secs(), 86_400);
        assert_eq!(DEFAULT_SWEEP_INTERVAL.as_secs(), 900);
        assert_eq!(DEFAULT_LOCKOUT_WINDOW.as_secs(), 600);
        assert_eq!(DEFAULT_MAX_ATTEMPTS, 5);
    }

    #[test]
    fn test_token_entropy_is_at_least_128_bits() {
        assert!(TOKEN_BYTES * 8 >= 128);
    }
}
