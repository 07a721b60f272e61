//! Server configuration module
//! Loads startup parameters for the chat server from the environment

use crate::constants::{
    DEFAULT_CLIENT_ORIGIN, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_STORE_TIMEOUT_MS, LONG_LIMIT,
    LONG_WINDOW_MS, MAX_HISTORY, SHORT_LIMIT, SHORT_WINDOW_MS,
};
use crate::core::rate_limiter::RateLimitConfig;
use crate::error::{ChatError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origin allowed to talk to the server (CORS and WebSocket handshake)
    pub client_origin: String,
    /// Burst and sustained message limits applied to every session
    pub rate_limits: RateLimitConfig,
    /// Number of messages kept per room after trimming
    pub max_history: usize,
    /// Durable message log; the in-memory store is used when unset
    pub store_path: Option<PathBuf>,
    /// Upper bound on any single store call
    pub store_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            client_origin: DEFAULT_CLIENT_ORIGIN.to_string(),
            rate_limits: RateLimitConfig::default(),
            max_history: MAX_HISTORY,
            store_path: None,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("RUSTY_ROOMS_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env::var("RUSTY_ROOMS_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let raw_origin = env::var("RUSTY_ROOMS_CLIENT_ORIGIN")
            .or_else(|_| env::var("CLIENT_ORIGIN"))
            .unwrap_or(DEFAULT_CLIENT_ORIGIN.to_string());
        let client_origin = Self::normalize_origin(&raw_origin)?;

        let rate_limits = RateLimitConfig {
            short_limit: parse_var("RUSTY_ROOMS_SHORT_LIMIT", SHORT_LIMIT),
            short_window_ms: parse_var("RUSTY_ROOMS_SHORT_WINDOW_MS", SHORT_WINDOW_MS),
            long_limit: parse_var("RUSTY_ROOMS_LONG_LIMIT", LONG_LIMIT),
            long_window_ms: parse_var("RUSTY_ROOMS_LONG_WINDOW_MS", LONG_WINDOW_MS),
        };
        rate_limits.validate()?;

        let max_history = parse_var("RUSTY_ROOMS_MAX_HISTORY", MAX_HISTORY);
        if max_history == 0 {
            return Err(ChatError::ConfigError(
                "RUSTY_ROOMS_MAX_HISTORY must be greater than zero".to_string(),
            ));
        }

        let store_path = env::var("RUSTY_ROOMS_STORE_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let timeout_ms = parse_var("RUSTY_ROOMS_STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS);

        Ok(Self {
            host,
            port,
            client_origin,
            rate_limits,
            max_history,
            store_path,
            store_timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Reduce a configured origin to `scheme://host[:port]`
    pub fn normalize_origin(raw: &str) -> Result<String> {
        let url = Url::parse(raw.trim()).map_err(|e| {
            ChatError::ConfigError(format!("Invalid client origin '{}': {}", raw, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ChatError::ConfigError(format!(
                "Client origin must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(ChatError::ConfigError(format!(
                "Client origin '{}' has no host",
                raw
            )));
        }

        Ok(url.origin().ascii_serialization())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_constants() {
        let config = ServerConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_history, 50);
        assert_eq!(config.rate_limits.short_limit, 5);
        assert_eq!(config.rate_limits.long_window_ms, 30_000);
        assert!(config.store_path.is_none());
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(
            ServerConfig::normalize_origin("http://localhost:5173/").unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            ServerConfig::normalize_origin("https://chat.example.com/app?x=1").unwrap(),
            "https://chat.example.com"
        );
    }

    #[test]
    fn test_normalize_origin_rejects_bad_values() {
        assert!(ServerConfig::normalize_origin("not a url").is_err());
        assert!(ServerConfig::normalize_origin("ftp://files.example.com").is_err());
    }

    #[test]
    fn test_from_env_rejects_inverted_windows() {
        env::set_var("RUSTY_ROOMS_SHORT_WINDOW_MS", "60000");
        let result = ServerConfig::from_env();
        env::remove_var("RUSTY_ROOMS_SHORT_WINDOW_MS");

        assert!(matches!(result, Err(ChatError::ConfigError(_))));
    }
}
