//! One-shot messages carried in the session between a redirect and the next
//! page view.

use crate::session::SessionHandle;
use sessionguard_auth::AuthError;
use std::collections::BTreeMap;

/// Session attribute holding pending messages.
pub const FLASH_KEY: &str = "flash";

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Informational.
    Info,
    /// Something the caller should fix.
    Warning,
    /// An operation failed.
    Error,
}

impl Level {
    const fn key(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Pending messages grouped by level.
pub type Messages = BTreeMap<String, Vec<String>>;

/// Queue a message for the next page view.
///
/// # Errors
///
/// Returns error if the session attribute cannot be encoded.
pub fn push(session: &SessionHandle, level: Level, message: &str) -> Result<(), AuthError> {
    let mut messages: Messages = session.get(FLASH_KEY).unwrap_or_default();
    messages
        .entry(level.key().to_string())
        .or_default()
        .push(message.to_string());
    session.insert(FLASH_KEY, messages)
}

/// Remove and return all pending messages.
#[must_use]
pub fn take(session: &SessionHandle) -> Messages {
    if session.get::<Messages>(FLASH_KEY).is_none() {
        return Messages::new();
    }
    session.take(FLASH_KEY).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_messages_are_consumed_once() {
        let session = SessionHandle::new(None, Duration::from_secs(60));
        push(&session, Level::Error, "first").unwrap();
        push(&session, Level::Error, "second").unwrap();
        push(&session, Level::Info, "hello").unwrap();

        let messages = take(&session);
        assert_eq!(messages["error"], vec!["first", "second"]);
        assert_eq!(messages["info"], vec!["hello"]);
        assert!(take(&session).is_empty());
    }
}
