//! Shared utilities for integration tests.

use std::sync::Arc;

use dyn_upstream::config::{GatewayConfig, ServerConfig, UpstreamConfig};
use dyn_upstream::lifecycle::build_engine;
use dyn_upstream::registry::PeerParams;
use dyn_upstream::Engine;

/// Configuration with one upstream `name` holding `servers` (address, weight).
pub fn config_with(name: &str, servers: &[(&str, i32)]) -> GatewayConfig {
    GatewayConfig {
        upstreams: vec![UpstreamConfig {
            name: name.to_string(),
            servers: servers
                .iter()
                .map(|(address, weight)| {
                    ServerConfig::new(
                        *address,
                        &PeerParams {
                            weight: *weight,
                            ..PeerParams::default()
                        },
                    )
                })
                .collect(),
        }],
        ..GatewayConfig::default()
    }
}

/// Engine over a default-sized region with one upstream.
pub fn engine_with(name: &str, servers: &[(&str, i32)]) -> Arc<Engine> {
    Arc::new(build_engine(&config_with(name, servers)).unwrap())
}

/// Engine whose region is `size` bytes of `page_size` pages.
#[allow(dead_code)]
pub fn small_engine(size: usize, page_size: usize, servers: &[(&str, i32)]) -> Arc<Engine> {
    let mut config = config_with("backends", servers);
    config.region.size_bytes = size;
    config.region.page_size = page_size;
    Arc::new(build_engine(&config).unwrap())
}

/// Names of every peer in `upstream`, in chain order.
#[allow(dead_code)]
pub fn peer_names(engine: &Engine, upstream: &str) -> Vec<String> {
    engine
        .snapshot(upstream)
        .map(|s| s.peers.into_iter().map(|p| p.name).collect())
        .unwrap_or_default()
}
