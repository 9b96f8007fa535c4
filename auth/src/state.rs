//! Session record model.
//!
//! A session is addressed by an opaque [`SessionId`] and carries a
//! [`SessionData`] payload: cookie metadata, the anti-forgery token, the
//! authenticated identity (if any) and arbitrary application attributes.

use crate::constants::TOKEN_BYTES;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Longest session id accepted from a cookie (matches the storage column).
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque, unguessable session identifier.
///
/// Generated ids are 32 random bytes from the OS RNG, base64url encoded.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session id.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accept an id supplied by a client.
    ///
    /// Returns `None` for empty, oversized or non-base64url values so that
    /// garbage cookies never reach the store.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_SESSION_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(raw.to_string()))
    }

    /// The id as stored and sent in the cookie.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix safe to put in logs.
    #[must_use]
    pub fn redacted(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

// Debug never prints the full id.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({}…)", self.redacted())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.redacted())
    }
}

/// Cookie metadata carried inside the payload.
///
/// Drives the record's expiry: an absolute `expires` wins over a relative
/// `max_age` (milliseconds), which wins over the store default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieMeta {
    /// Absolute expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,

    /// Relative lifetime in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
}

impl CookieMeta {
    /// Cookie with a relative lifetime.
    #[must_use]
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            expires: None,
            max_age: Some(i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX)),
        }
    }
}

/// The authenticated caller, as recorded in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    /// Primary key in the credential store.
    pub id: i64,
    /// Login name.
    pub identity: String,
    /// Human-readable name, when the credential store has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Session payload.
///
/// Serialized as a JSON object; unknown keys land in `attributes` so
/// application data round-trips untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Cookie metadata used to compute the expiry.
    #[serde(default)]
    pub cookie: CookieMeta,

    /// Anti-forgery token bound to this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,

    /// Logged-in caller, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<SessionIdentity>,

    /// Arbitrary application attributes.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl SessionData {
    /// Empty payload whose cookie lives for `max_age`.
    #[must_use]
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            cookie: CookieMeta::with_max_age(max_age),
            ..Self::default()
        }
    }

    /// Whether a caller is logged in on this session.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Read a typed attribute.
    ///
    /// Returns `None` when the key is missing or holds a different shape.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Store a typed attribute.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SerializationError` if `value` cannot be encoded.
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> crate::Result<()> {
        let value = serde_json::to_value(value)?;
        self.attributes.insert(key.into(), value);
        Ok(())
    }

    /// Remove an attribute, returning its raw value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// Expiry deadline in epoch milliseconds.
    ///
    /// Priority: absolute `cookie.expires`, then `cookie.max_age` from `now_ms`,
    /// then `default_ttl` from `now_ms`.
    #[must_use]
    pub fn expiry_ms(&self, now_ms: i64, default_ttl: Duration) -> i64 {
        if let Some(expires) = self.cookie.expires {
            return expires.timestamp_millis();
        }
        if let Some(max_age) = self.cookie.max_age {
            return now_ms.saturating_add(max_age);
        }
        let ttl_ms = i64::try_from(default_ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_add(ttl_ms)
    }

    /// Encode as the stored JSON text.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SerializationError` if an attribute fails to encode.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from stored JSON text.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SerializationError` for malformed payloads.
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// One stored session row.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Primary key.
    pub id: SessionId,
    /// Deadline in epoch milliseconds; at or past it the record is absent.
    pub expires_at_ms: i64,
    /// Session payload.
    pub data: SessionData,
    /// Last write or touch (informational).
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the record is logically absent at `now_ms`.
    #[must_use]
    pub const fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }
}
