//! Durable upstream store.
//!
//! # Data Flow
//! ```text
//! engine (after a successful mutation, lock released)
//!     → DurableStore::record_add / record_remove / record_update
//!     → toml_store.rs rewrites the state file
//!
//! startup:
//!     state file present → replaces config upstreams
//!     state file absent  → seeded from config upstreams
//! ```
//!
//! # Design Decisions
//! - Notifications are best effort; the in-memory registry is authoritative
//!   and a store failure never rolls a mutation back
//! - Each notification carries the peer's full resulting parameters, so
//!   the store never has to merge partial updates

pub mod toml_store;

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::registry::peer::PeerParams;

pub use toml_store::TomlStore;

/// Errors raised while persisting upstream state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse state file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("server {server} is not recorded in upstream {upstream}")]
    UnknownServer { upstream: String, server: String },
}

/// Receiver of committed registry changes.
pub trait DurableStore: Send + Sync + fmt::Debug {
    fn record_add(&self, upstream: &str, server: &str, params: &PeerParams) -> Result<(), StoreError>;

    fn record_remove(&self, upstream: &str, server: &str) -> Result<(), StoreError>;

    fn record_update(&self, upstream: &str, server: &str, params: &PeerParams) -> Result<(), StoreError>;
}

/// Store that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl DurableStore for NullStore {
    fn record_add(&self, _: &str, _: &str, _: &PeerParams) -> Result<(), StoreError> {
        Ok(())
    }

    fn record_remove(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn record_update(&self, _: &str, _: &str, _: &PeerParams) -> Result<(), StoreError> {
        Ok(())
    }
}
