//! # fg-ad
//!
//! Automatic differentiation (AD) primitives for FishGrowth.
//!
//! Provides:
//! - **Forward-mode AD** via [`dual::Dual`] numbers
//! - [`Scalar`](scalar::Scalar) trait for writing a log density once and
//!   evaluating it either as plain `f64` or as `Dual` for gradients

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dual;
pub mod scalar;

pub use dual::Dual;
pub use scalar::Scalar;
