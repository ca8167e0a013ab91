//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request for upstream
//!     → lock region (same lock the engine mutates under)
//!     → round_robin.rs walks the live chain, skipping down peers
//!     → Return peer name and address, or None
//! ```
//!
//! # Design Decisions
//! - Selection reads the chain as the engine left it, so added peers
//!   take traffic on the next pick and removed peers never do
//! - Weight updates reset the rotation of the updated peer only

pub mod round_robin;

pub use round_robin::{Selected, WeightedRoundRobin};
