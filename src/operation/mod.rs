//! Operation descriptors.
//!
//! # Data Flow
//! ```text
//! query arguments
//!     → request.rs (OpRequest, untyped)
//!     → TryFrom: numbers parsed, conflicting flags rejected
//!     → descriptor.rs (Operation, immutable)
//!     → engine dispatch
//! ```
//!
//! # Design Decisions
//! - Add and Remove are one `OpKind`, so both at once cannot be built
//! - Up and Down are one `Availability`, so both at once cannot be built
//! - Descriptors are consumed once and never shared across threads

pub mod descriptor;
pub mod error;
pub mod request;

pub use descriptor::{Availability, OpKind, Operation, ParamSet};
pub use error::OpError;
pub use request::OpRequest;
