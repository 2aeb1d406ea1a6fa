//! Shared types for the servin container & VM lifecycle core.
//!
//! This crate holds the pieces that both `servin-core` and `servin-cli`
//! need to agree on byte-for-byte: the error taxonomy, on-disk layout,
//! identifier format, and the port-mapping grammar. Nothing here talks
//! to the OS or to a VM; it is pure data and path arithmetic.

pub mod constants;
pub mod errors;
pub mod ids;
pub mod layout;
pub mod portspec;

pub use errors::{ServinError, ServinResult};
pub use ids::ContainerId;
pub use portspec::{PortMapping, PortProtocol};
