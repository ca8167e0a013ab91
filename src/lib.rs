//! Dynamic upstream peer registry.
//!
//! Upstream groups whose server lists change at runtime: peers live in a
//! shared slab region, operations arrive through the admin API and are
//! applied under one region lock.

pub mod admin;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod operation;
pub mod region;
pub mod registry;
pub mod store;

pub use config::schema::GatewayConfig;
pub use engine::{Engine, Outcome};
pub use operation::{OpError, OpRequest, Operation};
pub use region::{Region, SharedRegion};
