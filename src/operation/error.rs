//! Errors returned to administrative callers.

use thiserror::Error;

use crate::region::slab::AllocError;

/// Rejected operation. None of these leave a partial mutation behind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OpError {
    /// Add named a server the group already has.
    #[error("server {server} already exists in upstream {upstream}")]
    Conflict { upstream: String, server: String },

    /// Remove or update named a server the group does not have.
    #[error("server {server} is not found in upstream {upstream}")]
    NotFound { upstream: String, server: String },

    /// Remove would leave the group without a backend.
    #[error("upstream {upstream} must keep at least one server")]
    LastPeer { upstream: String },

    /// Server address could not be resolved.
    #[error("invalid server address {server}: {reason}")]
    InvalidAddress { server: String, reason: String },

    /// The region allocator ran out of memory.
    #[error("region exhausted: {0}")]
    ResourceExhausted(#[from] AllocError),

    /// Mutually exclusive or missing fields in the request.
    #[error("invalid operation: {0}")]
    InvalidDescriptor(String),

    /// A numeric argument did not parse as a positive integer.
    #[error("{name} is not a positive number: {value:?}")]
    BadParameter { name: &'static str, value: String },

    /// No upstream group with this name.
    #[error("upstream {0} is not found")]
    UpstreamNotFound(String),
}

impl OpError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidDescriptor(message.into())
    }

    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            OpError::Conflict { .. } => "conflict",
            OpError::NotFound { .. } => "not_found",
            OpError::LastPeer { .. } => "last_peer",
            OpError::InvalidAddress { .. } => "invalid_address",
            OpError::ResourceExhausted(_) => "resource_exhausted",
            OpError::InvalidDescriptor(_) => "invalid_descriptor",
            OpError::BadParameter { .. } => "bad_parameter",
            OpError::UpstreamNotFound(_) => "upstream_not_found",
        }
    }
}
