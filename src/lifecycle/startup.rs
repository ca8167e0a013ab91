//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared region from validated configuration
//! - Open the durable store and pick the authoritative upstream list
//! - Load every configured peer as a static peer
//! - Assemble the engine
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - A present state file replaces the configured upstreams
//! - Configured peers are static: only their scalar record uses the region

use std::sync::Arc;
use thiserror::Error;

use crate::config::{GatewayConfig, UpstreamConfig};
use crate::engine::resolver::Resolver;
use crate::engine::Engine;
use crate::operation::OpError;
use crate::region::slab::AllocError;
use crate::region::{Region, SharedRegion};
use crate::store::{DurableStore, NullStore, StoreError, TomlStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create region: {0}")]
    Region(#[from] AllocError),

    #[error("upstream {upstream}: {source}")]
    Server {
        upstream: String,
        #[source]
        source: OpError,
    },

    #[error("failed to open upstream store: {0}")]
    Store(#[from] StoreError),
}

/// Create a region holding every group of `upstreams`.
pub fn build_region(
    config: &GatewayConfig,
    upstreams: &[UpstreamConfig],
    resolver: &Resolver,
) -> Result<Region, StartupError> {
    let mut region = Region::new(config.region.size_bytes, config.region.page_size)?;

    for upstream in upstreams {
        region.create_upstream(&upstream.name);
        for server in &upstream.servers {
            let server_err = |source: OpError| StartupError::Server {
                upstream: upstream.name.clone(),
                source,
            };
            let address = resolver.resolve(&server.address).map_err(server_err)?;
            region
                .add_static_peer(&upstream.name, &server.address, address, &server.params())
                .map_err(|e| server_err(e.into()))?;
        }
        tracing::info!(
            upstream = %upstream.name,
            servers = upstream.servers.len(),
            "Upstream loaded"
        );
    }

    Ok(region)
}

/// Build the engine described by `config`.
pub fn build_engine(config: &GatewayConfig) -> Result<Engine, StartupError> {
    let resolver = Resolver::new(config.resolver.resolve_hostnames);

    let (store, upstreams): (Arc<dyn DurableStore>, Vec<UpstreamConfig>) = if config.store.enabled {
        let store = TomlStore::open(&config.store.path, &config.upstreams)?;
        let upstreams = store.upstreams();
        (Arc::new(store), upstreams)
    } else {
        (Arc::new(NullStore), config.upstreams.clone())
    };

    let region = build_region(config, &upstreams, &resolver)?;
    let stats = region.stats();
    tracing::info!(
        upstreams = stats.upstreams,
        peers = stats.peers,
        used_bytes = stats.used_bytes,
        total_bytes = stats.total_bytes,
        "Region ready"
    );

    Ok(Engine::new(SharedRegion::new(region), resolver, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::registry::PeerParams;

    fn config(servers: &[&str]) -> GatewayConfig {
        GatewayConfig {
            upstreams: vec![UpstreamConfig {
                name: "web".into(),
                servers: servers
                    .iter()
                    .map(|s| ServerConfig::new(*s, &PeerParams::default()))
                    .collect(),
            }],
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn test_build_engine_loads_static_peers() {
        let engine = build_engine(&config(&["127.0.0.1:6001", "127.0.0.1:6002"])).unwrap();
        let snapshot = engine.snapshot("web").unwrap();
        assert_eq!(snapshot.count, 2);
        assert!(snapshot.peers.iter().all(|p| !p.dynamic));
    }

    #[test]
    fn test_unresolvable_server_is_fatal() {
        let err = build_engine(&config(&["backend.invalid:80"])).unwrap_err();
        assert!(matches!(
            err,
            StartupError::Server {
                source: OpError::InvalidAddress { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_region_too_small() {
        let mut config = config(&["127.0.0.1:6001"]);
        config.region.size_bytes = 0;
        assert!(matches!(build_engine(&config), Err(StartupError::Region(_))));
    }
}
