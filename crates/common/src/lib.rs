//! Shared types, error definitions, and the transport seam used across all
//! festa crates.

pub mod error;
pub mod transport;
pub mod types;

pub use error::{Error, FromMessage, Result};
