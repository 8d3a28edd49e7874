//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Dial timeout in milliseconds, shared by forwards and health probes.
    pub timeout_ms: u64,

    /// Active health check settings.
    pub health_check: HealthCheckConfig,

    /// Named upstream groups that pools can pull URLs from.
    pub upstreams: HashMap<String, Vec<String>>,

    /// One pool per local listening port.
    pub pools: Vec<PoolConfig>,

    /// Request handling limits.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            health_check: HealthCheckConfig::default(),
            upstreams: HashMap::new(),
            pools: Vec::new(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Dial timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The ordered upstream URLs of a pool: its own `urls`, then the URLs of the
    /// referenced upstream group, if any.
    pub fn resolved_urls(&self, pool: &PoolConfig) -> Vec<String> {
        let mut urls = pool.urls.clone();
        if let Some(group) = pool.upstream.as_ref().and_then(|name| self.upstreams.get(name)) {
            urls.extend(group.iter().cloned());
        }
        urls
    }
}

/// A pool bound to one local port.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Local port to listen on.
    pub port: u16,

    /// Host header presented to primary upstreams. Defaults to the upstream authority.
    #[serde(default)]
    pub host: Option<String>,

    /// Ordered upstream URLs.
    #[serde(default, alias = "url")]
    pub urls: Vec<String>,

    /// Name of an upstream group whose URLs are appended to `urls`.
    #[serde(default)]
    pub upstream: Option<String>,

    /// Target used when no primary is alive. Never health checked.
    #[serde(default)]
    pub backup: Option<String>,

    /// Serve this port over TLS.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS configuration for a pool listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Seconds between two sweeps.
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Largest request body buffered so it can be replayed against a backup.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        timeout_ms = 1500

        [health_check]
        interval_secs = 3

        [upstreams]
        web = ["http://10.0.0.5:80", "http://10.0.0.6:80"]

        [[pools]]
        port = 8080
        host = "example.com"
        url = ["http://127.0.0.1:9001"]
        upstream = "web"
        backup = "http://127.0.0.1:9100"

        [[pools]]
        port = 8443
        urls = ["https://10.0.1.1"]

        [pools.tls]
        cert_path = "cert.pem"
        key_path = "key.pem"
    "#;

    #[test]
    fn parses_full_document() {
        let config: ProxyConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert_eq!(config.health_check.interval(), Duration::from_secs(3));
        assert_eq!(config.pools.len(), 2);

        let web = &config.pools[0];
        assert_eq!(web.host.as_deref(), Some("example.com"));
        assert_eq!(web.backup.as_deref(), Some("http://127.0.0.1:9100"));
        assert!(web.tls.is_none());
        assert_eq!(config.pools[1].tls.as_ref().unwrap().cert_path, "cert.pem");
    }

    #[test]
    fn group_urls_follow_pool_urls() {
        let config: ProxyConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(
            config.resolved_urls(&config.pools[0]),
            vec![
                "http://127.0.0.1:9001".to_string(),
                "http://10.0.0.5:80".to_string(),
                "http://10.0.0.6:80".to_string(),
            ]
        );
        assert_eq!(config.resolved_urls(&config.pools[1]), vec!["https://10.0.1.1".to_string()]);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.timeout_ms, 3000);
        assert_eq!(config.health_check.interval_secs, 10);
        assert_eq!(config.server.max_body_bytes, 2 * 1024 * 1024);
        assert!(config.pools.is_empty());
        assert!(!config.admin.enabled);
    }
}
