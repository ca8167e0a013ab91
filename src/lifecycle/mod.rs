//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Open store → Build region + static peers → Engine
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → admin server stops accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then region, then listeners
//! - The region lives as long as the process; shutdown only stops the API

pub mod signals;
pub mod startup;

pub use signals::shutdown_signal;
pub use startup::{build_engine, StartupError};
