//! Peer registry subsystem.
//!
//! # Data Flow
//! ```text
//! Registry (one per upstream group)
//!     head → Peer → Peer → Peer → None
//!             │
//!             ├── record   (region block, scalar fields)
//!             ├── name     (region block or static)
//!             └── address  (region block or static)
//!
//! After every structural change:
//!     walk chain → count, total_weight → single, weighted
//! ```
//!
//! # Design Decisions
//! - Links are arena handles, never raw pointers
//! - Aggregates are recomputed from the chain, never adjusted in place
//! - New peers are appended; enumeration order is insertion order

pub mod peer;
pub mod snapshot;
pub mod upstream;

pub use peer::{Peer, PeerId, PeerParams, PeerView};
pub use snapshot::{PeerSnapshot, UpstreamSnapshot};
pub use upstream::Registry;
