//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define registry metrics (operations, peers, region usage)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `dyn_upstream_operations_total` (counter): operations by kind, outcome
//! - `dyn_upstream_peers` (gauge): peers per upstream after a mutation
//! - `dyn_upstream_region_used_bytes` (gauge): allocator bytes in use
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests and
//!   embedders pay nothing
//! - Outcome label is the error label on failure, `ok` otherwise

use std::net::SocketAddr;
use metrics_exporter_prometheus::PrometheusBuilder;

pub const OPERATIONS_TOTAL: &str = "dyn_upstream_operations_total";
pub const PEERS: &str = "dyn_upstream_peers";
pub const REGION_USED_BYTES: &str = "dyn_upstream_region_used_bytes";

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            metrics::describe_counter!(OPERATIONS_TOTAL, "Administrative operations by kind and outcome");
            metrics::describe_gauge!(PEERS, "Peers linked in each upstream");
            metrics::describe_gauge!(REGION_USED_BYTES, "Bytes allocated from the shared region");
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        }
    }
}

pub fn record_operation(kind: &str, outcome: &str) {
    metrics::counter!(
        OPERATIONS_TOTAL,
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_peer_count(upstream: &str, count: usize) {
    metrics::gauge!(PEERS, "upstream" => upstream.to_string()).set(count as f64);
}

pub fn record_region_usage(used_bytes: usize) {
    metrics::gauge!(REGION_USED_BYTES).set(used_bytes as f64);
}
