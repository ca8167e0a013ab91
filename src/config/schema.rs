//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::registry::peer::{
    PeerParams, DEFAULT_FAIL_TIMEOUT, DEFAULT_MAX_FAILS, DEFAULT_WEIGHT,
};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Shared region sizing.
    pub region: RegionConfig,

    /// Upstream groups loaded at startup.
    pub upstreams: Vec<UpstreamConfig>,

    /// Server address resolution.
    pub resolver: ResolverConfig,

    /// Durable state file.
    pub store: StoreConfig,

    /// Administrative API.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Shared region configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Total region size in bytes.
    pub size_bytes: usize,

    /// Page size in bytes (power of two).
    pub page_size: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            size_bytes: 1024 * 1024,
            page_size: 4096,
        }
    }
}

/// One upstream group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Group name, used as the `upstream` argument of operations.
    pub name: String,

    /// Servers in enumeration order.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

/// One server inside an upstream group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server address (e.g., "127.0.0.1:8080"); also the peer's name.
    pub address: String,

    /// Weight for weighted round robin (default: 1).
    #[serde(default = "default_weight")]
    pub weight: i32,

    /// Failures before the server is considered unusable (default: 1).
    #[serde(default = "default_max_fails")]
    pub max_fails: u32,

    /// Seconds a failed server stays excluded (default: 10).
    #[serde(default = "default_fail_timeout")]
    pub fail_timeout: u32,

    /// Administratively disabled.
    #[serde(default)]
    pub down: bool,
}

impl ServerConfig {
    pub fn new(address: impl Into<String>, params: &PeerParams) -> Self {
        Self {
            address: address.into(),
            weight: params.weight,
            max_fails: params.max_fails,
            fail_timeout: params.fail_timeout,
            down: params.down,
        }
    }

    pub fn params(&self) -> PeerParams {
        PeerParams {
            weight: self.weight,
            max_fails: self.max_fails,
            fail_timeout: self.fail_timeout,
            down: self.down,
        }
    }
}

fn default_weight() -> i32 {
    DEFAULT_WEIGHT
}

fn default_max_fails() -> u32 {
    DEFAULT_MAX_FAILS
}

fn default_fail_timeout() -> u32 {
    DEFAULT_FAIL_TIMEOUT
}

/// Address resolution configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Resolve hostnames through the system resolver. When off, only
    /// literal IP addresses are accepted.
    pub resolve_hostnames: bool,
}

/// Durable state file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Persist every successful mutation.
    pub enabled: bool,

    /// State file path.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "upstreams.state.toml".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Bearer token; requests are unauthenticated when unset.
    pub api_key: Option<String>,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            bind_address: "127.0.0.1:8081".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[upstreams]]
            name = "web"

            [[upstreams.servers]]
            address = "127.0.0.1:6001"

            [[upstreams.servers]]
            address = "127.0.0.1:6002"
            weight = 5
            down = true
            "#,
        )
        .unwrap();

        let servers = &config.upstreams[0].servers;
        assert_eq!(servers[0].params(), PeerParams::default());
        assert_eq!(servers[1].weight, 5);
        assert_eq!(servers[1].max_fails, 1);
        assert_eq!(servers[1].fail_timeout, 10);
        assert!(servers[1].down);
        assert_eq!(config.region.page_size, 4096);
        assert!(config.admin.enabled);
    }
}
