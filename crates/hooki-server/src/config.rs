//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use hooki_shared::constants::{
    APP_NAME, DEFAULT_HTTP_PORT, DEFAULT_POST_RADIUS_M, DEFAULT_USER_RADIUS_M,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP + WebSocket server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// SQLite database file. When unset, everything is kept in memory and
    /// lost on restart (single-instance deployments only).
    /// Env: `STORE_PATH`
    pub store_path: Option<PathBuf>,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Hooki"`
    pub instance_name: String,

    /// Radius used by `GET /posts` when the client sends none, in meters.
    /// Env: `POST_RADIUS_M`
    /// Default: `1000`
    pub default_post_radius_m: f64,

    /// Radius used by `GET /users/nearby` when the client sends none.
    /// Env: `USER_RADIUS_M`
    /// Default: `500`
    pub default_user_radius_m: f64,

    /// Maximum number of concurrent realtime connections (0 = unlimited).
    /// Env: `MAX_CONNECTIONS`
    /// Default: `0`
    pub max_connections: usize,

    /// Sustained requests per second allowed per client IP (REST) and per
    /// connection (realtime sends).
    /// Env: `RATE_LIMIT_PER_SEC`
    /// Default: `10`
    pub rate_limit_per_sec: f64,

    /// Burst capacity of the rate limiter.
    /// Env: `RATE_LIMIT_BURST`
    /// Default: `30`
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            store_path: None,
            instance_name: APP_NAME.to_string(),
            default_post_radius_m: DEFAULT_POST_RADIUS_M,
            default_user_radius_m: DEFAULT_USER_RADIUS_M,
            max_connections: 0,
            rate_limit_per_sec: 10.0,
            rate_limit_burst: 30.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            parse_into("HTTP_ADDR", &addr, &mut config.http_addr);
        } else if let Some(port) = lookup("PORT") {
            let mut parsed = DEFAULT_HTTP_PORT;
            parse_into("PORT", &port, &mut parsed);
            config.http_addr.set_port(parsed);
        }

        if let Some(path) = lookup("STORE_PATH") {
            if !path.trim().is_empty() {
                config.store_path = Some(PathBuf::from(path));
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(val) = lookup("POST_RADIUS_M") {
            parse_into("POST_RADIUS_M", &val, &mut config.default_post_radius_m);
        }

        if let Some(val) = lookup("USER_RADIUS_M") {
            parse_into("USER_RADIUS_M", &val, &mut config.default_user_radius_m);
        }

        if let Some(val) = lookup("MAX_CONNECTIONS") {
            parse_into("MAX_CONNECTIONS", &val, &mut config.max_connections);
        }

        if let Some(val) = lookup("RATE_LIMIT_PER_SEC") {
            parse_into("RATE_LIMIT_PER_SEC", &val, &mut config.rate_limit_per_sec);
        }

        if let Some(val) = lookup("RATE_LIMIT_BURST") {
            parse_into("RATE_LIMIT_BURST", &val, &mut config.rate_limit_burst);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

/// Overwrite `target` with the parsed value, or warn and keep the default.
fn parse_into<T: FromStr>(key: &str, raw: &str, target: &mut T) {
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 3000).into());
        assert!(config.store_path.is_none());
        assert_eq!(config.default_post_radius_m, 1000.0);
        assert_eq!(config.default_user_radius_m, 500.0);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("STORE_PATH", "/tmp/hooki.db"),
            ("POST_RADIUS_M", "250"),
            ("MAX_CONNECTIONS", "64"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/hooki.db")));
        assert_eq!(config.default_post_radius_m, 250.0);
        assert_eq!(config.max_connections, 64);
    }

    #[test]
    fn test_port_only() {
        let config = config_from(&[("PORT", "4000")]);
        assert_eq!(config.http_addr.port(), 4000);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[("HTTP_ADDR", "not-an-addr"), ("USER_RADIUS_M", "far")]);
        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
        assert_eq!(config.default_user_radius_m, 500.0);
    }
}
