//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! engine, admin, startup produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`upstream`, `server`, `kind`) on every engine event
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
