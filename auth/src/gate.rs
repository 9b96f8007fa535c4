//! The "is this caller logged in" predicate and what to do when it fails.

use crate::state::SessionData;

/// Where unauthenticated browser requests are sent.
pub const LOGIN_PATH: &str = "/login";

/// Outcome of gating a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Caller is authenticated; run the handler.
    Allow,
    /// Browser caller; redirect to the login page.
    RedirectToLogin,
    /// API caller; answer 401.
    Unauthorized,
}

/// Whether the request carries a session with a logged-in identity.
///
/// # Examples
///
/// ```
/// # use sessionguard_auth::gate::is_authenticated;
/// # use sessionguard_auth::state::SessionData;
/// assert!(!is_authenticated(None));
/// assert!(!is_authenticated(Some(&SessionData::default())));
/// ```
#[must_use]
pub fn is_authenticated(session: Option<&SessionData>) -> bool {
    session.is_some_and(SessionData::is_authenticated)
}

/// Decide how to treat a request given its session and whether the caller
/// prefers HTML.
#[must_use]
pub fn decide(session: Option<&SessionData>, wants_html: bool) -> GateDecision {
    if is_authenticated(session) {
        GateDecision::Allow
    } else if wants_html {
        GateDecision::RedirectToLogin
    } else {
        GateDecision::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionIdentity;

    fn logged_in() -> SessionData {
        SessionData {
            identity: Some(SessionIdentity {
                id: 1,
                identity: "alice".to_string(),
                display_name: None,
            }),
            ..SessionData::default()
        }
    }

    #[test]
    fn test_authenticated_session_allowed() {
        let session = logged_in();
        assert!(is_authenticated(Some(&session)));
        assert_eq!(decide(Some(&session), true), GateDecision::Allow);
        assert_eq!(decide(Some(&session), false), GateDecision::Allow);
    }

    #[test]
    fn test_anonymous_callers() {
        assert_eq!(decide(None, true), GateDecision::RedirectToLogin);
        assert_eq!(decide(Some(&SessionData::default()), false), GateDecision::Unauthorized);
    }
}
