//! Configuration for the archive auth server.

use std::path::PathBuf;
use std::time::Duration;

/// OAuth protocol constants.
pub mod oauth {
    /// Lifetime of an issued access token, in seconds.
    pub const ACCESS_TOKEN_LIFETIME: i64 = 3600;

    /// Raw bytes of entropy in a client's public identifier (hex-encoded on the wire).
    pub const CLIENT_ID_BYTES: usize = 16;

    /// Raw bytes of entropy in a client's secret (hex-encoded on the wire).
    pub const CLIENT_SECRET_BYTES: usize = 32;

    /// The only grant type the token endpoint accepts (RFC 6749 §4.4).
    pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

    /// Token endpoint path.
    pub const TOKEN_PATH: &str = "/private/oauth/token";
}

/// Server defaults.
pub mod defaults {
    use std::time::Duration;

    /// SQLite database file.
    pub const DATABASE_PATH: &str = "archive.db";

    /// HTTP port.
    pub const PORT: u16 = 8080;

    /// Secret cache TTL (5 minutes). Never longer than the token lifetime.
    pub const SECRET_CACHE_TTL: Duration = Duration::from_secs(300);

    /// Maximum number of cached client secrets.
    pub const SECRET_CACHE_MAX_SIZE: u64 = 1000;
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite credential database.
    pub database_path: PathBuf,

    /// HTTP listen port.
    pub port: u16,

    /// TTL of the `public_id → secret` read-through cache. Zero disables it.
    pub secret_cache_ttl: Duration,

    /// Maximum entries in the secret cache.
    pub secret_cache_max_size: u64,
}

impl Config {
    /// Create a configuration for the given database path with default settings.
    #[must_use]
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            port: defaults::PORT,
            secret_cache_ttl: defaults::SECRET_CACHE_TTL,
            secret_cache_max_size: defaults::SECRET_CACHE_MAX_SIZE,
        }
    }

    /// Set the secret cache TTL, clamped to the access token lifetime.
    #[must_use]
    pub fn with_secret_cache_ttl(mut self, ttl: Duration) -> Self {
        self.secret_cache_ttl = ttl.min(max_secret_cache_ttl());
        self
    }

    /// Whether the secret cache is enabled.
    #[must_use]
    pub const fn secret_cache_enabled(&self) -> bool {
        !self.secret_cache_ttl.is_zero() && self.secret_cache_max_size > 0
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(defaults::DATABASE_PATH)
    }
}

fn max_secret_cache_ttl() -> Duration {
    Duration::from_secs(oauth::ACCESS_TOKEN_LIFETIME.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, PathBuf::from("archive.db"));
        assert!(config.secret_cache_enabled());
    }

    #[test]
    fn test_cache_ttl_clamped_to_token_lifetime() {
        let config = Config::default().with_secret_cache_ttl(Duration::from_secs(86_400));
        assert_eq!(config.secret_cache_ttl, Duration::from_secs(3600));

        let config = Config::default().with_secret_cache_ttl(Duration::from_secs(60));
        assert_eq!(config.secret_cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_oauth_constants() {
        assert_eq!(oauth::ACCESS_TOKEN_LIFETIME, 3600);
        assert_eq!(oauth::CLIENT_ID_BYTES * 2, 32);
        assert_eq!(oauth::CLIENT_SECRET_BYTES * 2, 64);
    }
}
