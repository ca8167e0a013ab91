//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → lifecycle::startup builds region, store and engine from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; runtime changes go through the
//!   admin API and the durable store, not the config file
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::GatewayConfig;
pub use schema::RegionConfig;
pub use schema::UpstreamConfig;
pub use schema::ServerConfig;
pub use schema::AdminConfig;
pub use schema::ObservabilityConfig;
