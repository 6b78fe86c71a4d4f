//! Configuration Module
//!
//! Loads cache and server settings from environment variables.

use std::env;

use crate::backend::BackendKind;
use crate::manager::{CacheManagerConfig, DEFAULT_EXPIRE, DEFAULT_PREFIX};

/// Cache and server configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix prepended to every generated key
    pub prefix: String,
    /// Default expiration in seconds (0 = no expiration)
    pub default_expire: u64,
    /// Whether cache-aside wrapping is active
    pub enabled: bool,
    /// Backend built at startup
    pub backend: BackendKind,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PREFIX` - Key prefix (default: `use-cache:`)
    /// - `CACHE_DEFAULT_EXPIRE` - Default expiration in seconds (default: 600)
    /// - `CACHE_ENABLED` - `true`/`false` (default: true)
    /// - `CACHE_BACKEND` - `memory` or `null` (default: memory)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.prefix),
            default_expire: env::var("CACHE_DEFAULT_EXPIRE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_expire),
            enabled: env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.enabled),
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }

    /// Builds the configured backend and wraps everything into a manager
    /// configuration with the default coder and key builder.
    pub fn manager_config(&self) -> CacheManagerConfig {
        CacheManagerConfig::new(self.backend.build())
            .prefix(self.prefix.clone())
            .expire(self.default_expire)
            .enabled(self.enabled)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            default_expire: DEFAULT_EXPIRE,
            enabled: true,
            backend: BackendKind::Memory,
            server_port: 3000,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.prefix, "use-cache:");
        assert_eq!(config.default_expire, 600);
        assert!(config.enabled);
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_PREFIX");
        env::remove_var("CACHE_DEFAULT_EXPIRE");
        env::remove_var("CACHE_ENABLED");
        env::remove_var("CACHE_BACKEND");
        env::remove_var("SERVER_PORT");

        let config = Config::from_env();
        assert_eq!(config.prefix, "use-cache:");
        assert_eq!(config.default_expire, 600);
        assert!(config.enabled);
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_manager_config() {
        let config = Config {
            prefix: "svc:".into(),
            default_expire: 30,
            enabled: false,
            ..Config::default()
        };
        let manager_config = config.manager_config();
        assert_eq!(manager_config.prefix, "svc:");
        assert_eq!(manager_config.default_expire, 30);
        assert!(!manager_config.enabled);
    }
}
