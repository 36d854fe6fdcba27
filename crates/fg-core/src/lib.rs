//! # fg-core
//!
//! Core types, traits, and error handling for FishGrowth.
//!
//! This crate provides:
//! - The crate-wide error type
//! - The [`LogDensityModel`] boundary consumed by external inference engines
//! - [`DrawMatrix`], the draws × observations container shared by the
//!   generated-quantities and LOO layers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{GeneratedQuantities, LogDensityModel, PreparedModelRef, PreparedNll};
pub use types::{DrawMatrix, GeneratedDraw};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
