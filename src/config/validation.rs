//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate region layout (page size, region size)
//! - Detect duplicate upstreams and duplicate servers within a group
//! - Validate value ranges (weights, thresholds > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("region page size {0} must be a power of two between 64 and 65536")]
    PageSize(usize),

    #[error("region size {size} must hold at least one {page_size} byte page")]
    RegionSize { size: usize, page_size: usize },

    #[error("upstream name must not be empty")]
    EmptyUpstreamName,

    #[error("upstream {0} is defined more than once")]
    DuplicateUpstream(String),

    #[error("upstream {0} has no servers")]
    EmptyUpstream(String),

    #[error("server {server} appears twice in upstream {upstream}")]
    DuplicateServer { upstream: String, server: String },

    #[error("server {server} in upstream {upstream}: {field} must be positive")]
    NonPositive {
        upstream: String,
        server: String,
        field: &'static str,
    },

    #[error("invalid {field} address: {value}")]
    BindAddress { field: &'static str, value: String },
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let page_size = config.region.page_size;
    if !page_size.is_power_of_two() || !(64..=65536).contains(&page_size) {
        errors.push(ValidationError::PageSize(page_size));
    } else if config.region.size_bytes < page_size {
        errors.push(ValidationError::RegionSize {
            size: config.region.size_bytes,
            page_size,
        });
    }

    let mut names = HashSet::new();
    for upstream in &config.upstreams {
        if upstream.name.is_empty() {
            errors.push(ValidationError::EmptyUpstreamName);
        } else if !names.insert(upstream.name.as_str()) {
            errors.push(ValidationError::DuplicateUpstream(upstream.name.clone()));
        }
        if upstream.servers.is_empty() {
            errors.push(ValidationError::EmptyUpstream(upstream.name.clone()));
        }

        let mut servers = HashSet::new();
        for server in &upstream.servers {
            if !servers.insert(server.address.as_str()) {
                errors.push(ValidationError::DuplicateServer {
                    upstream: upstream.name.clone(),
                    server: server.address.clone(),
                });
            }
            let non_positive = [
                ("weight", server.weight <= 0),
                ("max_fails", server.max_fails == 0),
                ("fail_timeout", server.fail_timeout == 0),
            ];
            for (field, bad) in non_positive {
                if bad {
                    errors.push(ValidationError::NonPositive {
                        upstream: upstream.name.clone(),
                        server: server.address.clone(),
                        field,
                    });
                }
            }
        }
    }

    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress {
            field: "admin",
            value: config.admin.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BindAddress {
            field: "metrics",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ServerConfig, UpstreamConfig};
    use crate::registry::peer::PeerParams;

    fn upstream(name: &str, servers: &[&str]) -> UpstreamConfig {
        UpstreamConfig {
            name: name.to_string(),
            servers: servers
                .iter()
                .map(|s| ServerConfig::new(*s, &PeerParams::default()))
                .collect(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.region.page_size = 1000;
        config.upstreams = vec![
            upstream("web", &["127.0.0.1:1", "127.0.0.1:1"]),
            upstream("web", &[]),
        ];
        config.upstreams[0].servers[0].weight = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::PageSize(1000)));
        assert!(errors.contains(&ValidationError::DuplicateUpstream("web".into())));
        assert!(errors.contains(&ValidationError::EmptyUpstream("web".into())));
        assert!(errors.contains(&ValidationError::DuplicateServer {
            upstream: "web".into(),
            server: "127.0.0.1:1".into(),
        }));
        assert!(errors.contains(&ValidationError::NonPositive {
            upstream: "web".into(),
            server: "127.0.0.1:1".into(),
            field: "weight",
        }));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_region_smaller_than_page() {
        let mut config = GatewayConfig::default();
        config.region.size_bytes = 100;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::RegionSize {
                size: 100,
                page_size: 4096
            }])
        );
    }
}
