//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which cache service backs the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Shared memcached instance
    Memcached,
    /// Process-local bounded store
    Memory,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memcached" | "memcache" => Ok(CacheBackendKind::Memcached),
            "memory" | "mem" => Ok(CacheBackendKind::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Upstream API host
    pub upstream_host: String,
    /// Upstream API port
    pub upstream_port: u16,
    /// Whole-request timeout for upstream calls, in seconds
    pub upstream_timeout: u64,
    /// Cache service selection
    pub cache_backend: CacheBackendKind,
    /// memcached address (host:port)
    pub memcached_addr: String,
    /// Per-operation cache timeout, in milliseconds
    pub cache_timeout_ms: u64,
    /// Capacity of the in-memory backend
    pub max_entries: usize,
    /// Largest encoded envelope that will be stored
    pub max_value_size: usize,
    /// Largest inbound request body that will be buffered
    pub max_body_bytes: usize,
    /// Interval in seconds between metric reports, 0 disables reporting
    pub metrics_log_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_HOST` - Upstream host (default: 127.0.0.1)
    /// - `UPSTREAM_PORT` - Upstream port (default: 8000)
    /// - `UPSTREAM_TIMEOUT_SECS` - Upstream timeout (default: 30)
    /// - `CACHE_BACKEND` - `memcached` or `memory` (default: memcached)
    /// - `MEMCACHED_ADDR` - memcached address (default: 127.0.0.1:11211)
    /// - `CACHE_TIMEOUT_MS` - Cache operation timeout (default: 500)
    /// - `MAX_ENTRIES` - In-memory backend capacity (default: 1000)
    /// - `MAX_VALUE_SIZE` - Largest cached envelope in bytes (default: 1 MB)
    /// - `MAX_BODY_BYTES` - Largest request body in bytes (default: 10 MB)
    /// - `METRICS_LOG_INTERVAL` - Metric report interval in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            upstream_host: env::var("UPSTREAM_HOST")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.upstream_host),
            upstream_port: parse_var("UPSTREAM_PORT").unwrap_or(defaults.upstream_port),
            upstream_timeout: parse_var("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or(defaults.upstream_timeout),
            cache_backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.cache_backend),
            memcached_addr: env::var("MEMCACHED_ADDR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.memcached_addr),
            cache_timeout_ms: parse_var("CACHE_TIMEOUT_MS").unwrap_or(defaults.cache_timeout_ms),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            max_value_size: parse_var("MAX_VALUE_SIZE").unwrap_or(defaults.max_value_size),
            max_body_bytes: parse_var("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            metrics_log_interval: parse_var("METRICS_LOG_INTERVAL")
                .unwrap_or(defaults.metrics_log_interval),
        }
    }

    /// Base URL of the upstream, without a trailing slash.
    pub fn upstream_base(&self) -> String {
        format!("http://{}:{}", self.upstream_host, self.upstream_port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            upstream_host: "127.0.0.1".to_string(),
            upstream_port: 8000,
            upstream_timeout: 30,
            cache_backend: CacheBackendKind::Memcached,
            memcached_addr: "127.0.0.1:11211".to_string(),
            cache_timeout_ms: 500,
            max_entries: 1000,
            max_value_size: 1024 * 1024,
            max_body_bytes: 10 * 1024 * 1024,
            metrics_log_interval: 60,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
