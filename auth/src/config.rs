//! Session, throttle and credential configuration.
//!
//! Every value has a default; [`AuthConfig::from_env`] overlays environment
//! variables on top. Unparseable numbers fall back to the default.

use crate::constants::{
    DEFAULT_LOCKOUT_WINDOW, DEFAULT_MAX_ATTEMPTS, DEFAULT_SESSION_TABLE, DEFAULT_SESSION_TTL,
    DEFAULT_SWEEP_INTERVAL, SESSION_COOKIE_NAME,
};
use std::env;
use std::time::Duration;

/// Default table holding credential rows.
pub const DEFAULT_CREDENTIALS_TABLE: &str = "credentials";

/// Which session store backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local map; sessions are lost on restart.
    Memory,
    /// Relational table shared by every instance.
    Persistent,
}

impl StoreBackend {
    /// Parse a `SESSION_STORE` value.
    ///
    /// Accepts `memory` and `persistent` (with `postgres`/`mysql` as aliases),
    /// case-insensitively. Returns `None` for anything else.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sessionguard_auth::config::StoreBackend;
    /// assert_eq!(StoreBackend::parse(" Postgres "), Some(StoreBackend::Persistent));
    /// assert_eq!(StoreBackend::parse("redis"), None);
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "persistent" | "postgres" | "mysql" => Some(Self::Persistent),
            _ => None,
        }
    }

    /// Backend used when nothing is configured.
    #[must_use]
    pub const fn default_for(production: bool) -> Self {
        if production { Self::Persistent } else { Self::Memory }
    }

    /// Name reported by health checks and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Persistent => "persistent",
        }
    }
}

/// Reduce a table name to `[A-Za-z0-9_]`, falling back to `fallback` when
/// nothing survives or the result starts with a digit (not a valid unquoted
/// identifier).
///
/// # Examples
///
/// ```
/// # use sessionguard_auth::config::sanitize_identifier;
/// assert_eq!(sanitize_identifier("app-sessions; DROP", "user_sessions"), "appsessionsDROP");
/// assert_eq!(sanitize_identifier("--", "user_sessions"), "user_sessions");
/// assert_eq!(sanitize_identifier("1sessions", "user_sessions"), "user_sessions");
/// ```
#[must_use]
pub fn sanitize_identifier(raw: &str, fallback: &str) -> String {
    let clean: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if clean.is_empty() || clean.starts_with(|c: char| c.is_ascii_digit()) {
        fallback.to_string()
    } else {
        clean
    }
}

/// Session storage and cookie configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Store backend.
    pub backend: StoreBackend,

    /// Table name for the persistent store (already sanitized).
    ///
    /// Default: `user_sessions`
    pub table: String,

    /// Lifetime applied when the payload carries no cookie expiry.
    ///
    /// Default: 24 hours
    pub ttl: Duration,

    /// Expiry sweep period. Zero disables the sweeper.
    ///
    /// Default: 15 minutes
    pub sweep_interval: Duration,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Whether the cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
}

impl SessionConfig {
    /// Configuration for the given backend with default values.
    #[must_use]
    pub fn new(backend: StoreBackend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Set the table name (sanitized).
    #[must_use]
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = sanitize_identifier(table, DEFAULT_SESSION_TABLE);
        self
    }

    /// Set the default session lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the sweep period.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the cookie name.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Toggle the `Secure` cookie attribute.
    #[must_use]
    pub const fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            table: DEFAULT_SESSION_TABLE.to_string(),
            ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            cookie_name: SESSION_COOKIE_NAME.to_string(),
            cookie_secure: false,
        }
    }
}

/// Login throttle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Failures that trigger a lock.
    ///
    /// Default: 5
    pub max_attempts: u32,

    /// How long a locked key stays locked.
    ///
    /// Default: 10 minutes
    pub lockout_window: Duration,
}

impl ThrottleConfig {
    /// Create throttle configuration.
    #[must_use]
    pub const fn new(max_attempts: u32, lockout_window: Duration) -> Self {
        Self {
            max_attempts,
            lockout_window,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_WINDOW)
    }
}

/// Top-level configuration for the session and login layer.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Running in production (`APP_ENV`/`NODE_ENV` = `production`).
    pub production: bool,
    /// Session store and cookie settings.
    pub session: SessionConfig,
    /// Login throttle settings.
    pub throttle: ThrottleConfig,
    /// `PostgreSQL` connection URL, required by the persistent backend.
    pub database_url: Option<String>,
    /// Table holding credential rows (sanitized).
    pub credentials_table: String,
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// Invalid `SESSION_STORE` values log a warning and select the memory
    /// backend.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("APP_ENV")
            .or_else(|| lookup("NODE_ENV"))
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("production"));

        let backend = match lookup("SESSION_STORE").filter(|raw| !raw.trim().is_empty()) {
            None => StoreBackend::default_for(production),
            Some(raw) => StoreBackend::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Invalid SESSION_STORE, falling back to memory store");
                StoreBackend::Memory
            }),
        };

        let millis = |key: &str| -> Option<Duration> {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
        };

        let session = SessionConfig {
            backend,
            table: sanitize_identifier(
                &lookup("SESSION_TABLE").unwrap_or_default(),
                DEFAULT_SESSION_TABLE,
            ),
            ttl: millis("SESSION_TTL_MS")
                .filter(|ttl| !ttl.is_zero())
                .unwrap_or(DEFAULT_SESSION_TTL),
            sweep_interval: millis("SESSION_CLEANUP_INTERVAL_MS").unwrap_or(DEFAULT_SWEEP_INTERVAL),
            cookie_name: lookup("SESSION_COOKIE_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| SESSION_COOKIE_NAME.to_string()),
            cookie_secure: production,
        };

        let throttle = ThrottleConfig {
            max_attempts: lookup("LOGIN_MAX_ATTEMPTS")
                .and_then(|s| s.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            lockout_window: millis("LOGIN_LOCKOUT_MS").unwrap_or(DEFAULT_LOCKOUT_WINDOW),
        };

        Self {
            production,
            session,
            throttle,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            credentials_table: sanitize_identifier(
                &lookup("CREDENTIALS_TABLE").unwrap_or_default(),
                DEFAULT_CREDENTIALS_TABLE,
            ),
        }
    }
}
