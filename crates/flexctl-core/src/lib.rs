//! flexctl-core: Error and shared type definitions for flexctl.
//!
//! This crate defines the types shared between the protocol client and
//! consuming applications, without pulling in any I/O machinery.
//!
//! # Key types
//!
//! - [`Error`] / [`Result`] -- error handling
//! - [`Mode`] -- the operating mode of a slice receiver

pub mod error;
pub mod types;

// Re-export key types at crate root for ergonomic `use flexctl_core::*`.
pub use error::{Error, Result};
pub use types::Mode;
