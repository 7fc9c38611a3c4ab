//! Campus Core - Shared error handling, logging, and types
//!
//! This crate defines the foundation shared by every Campus client
//! subsystem: the structured error type, logging bootstrap, and the
//! role types that partition the two authenticated user populations.

pub mod error;
pub mod logging;
pub mod types;

pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
