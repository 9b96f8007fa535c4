//! HTTP server configuration.

use sessionguard_auth::AuthConfig;
use std::env;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Honour `X-Forwarded-For` / `X-Real-IP` for the client address
    pub trust_proxy: bool,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// Session and login settings
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `3000` |
    /// | `TRUST_PROXY` | `false` |
    /// | `DATABASE_MAX_CONNECTIONS` | `10` |
    ///
    /// Session and login variables are read by [`AuthConfig::from_env`].
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            trust_proxy: env::var("TRUST_PROXY")
                .ok()
                .is_some_and(|s| parse_flag(&s)),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            auth: AuthConfig::from_env(),
        }
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
