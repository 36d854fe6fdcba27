//! Probability building blocks for FishGrowth.
//!
//! This crate hosts reusable probability math used by the growth models:
//! - base log densities (normal, lognormal, Dirichlet, LKJ on Cholesky factors)
//! - constraining transforms with log-Jacobians (positive, simplex, correlation Cholesky)
//! - small numeric helpers (stable log-sum-exp, log1p-exp, sigmoid)
//!
//! Density kernels are generic over [`fg_ad::Scalar`] so the same code path
//! evaluates values and forward-mode gradients.

pub mod math;
pub mod dirichlet;
pub mod distributions;
pub mod lkj;
pub mod lognormal;
pub mod normal;
pub mod transforms;
