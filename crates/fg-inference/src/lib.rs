//! # fg-inference
//!
//! Post-sampling analysis for FishGrowth models.
//!
//! Draws come from an external engine that drives a
//! [`fg_core::LogDensityModel`]. This crate provides:
//! - [`PosteriorDraws`], multi-chain draw storage, and MCMC diagnostics
//!   (split R-hat, bulk/tail ESS, relative efficiency)
//! - generated quantities over all draws ([`generated_quantities_draws`])
//! - Pareto-smoothed importance sampling and PSIS-LOO ([`psis_loo`],
//!   [`loo_compare`])
//! - LOO-PIT calibration checks ([`calibration`])

#![warn(missing_docs)]
#![warn(clippy::all)]

/// LOO-PIT values, ECDF differences, KS test, simulated uniform envelopes.
pub mod calibration;
/// MCMC diagnostics: split R-hat, bulk/tail ESS, relative efficiency.
pub mod diagnostics;
/// Multi-chain posterior draw storage.
pub mod draws;
/// Generated quantities over every draw.
pub mod generated;
/// PSIS-LOO estimates and model comparison.
pub mod loo;
/// Pareto-smoothed importance sampling.
pub mod psis;

pub use calibration::{KsTest, UniformEnvelope, ecdf_difference, ks_uniform, loo_pit, uniform_envelope};
pub use diagnostics::{DiagnosticsResult, compute_diagnostics, relative_efficiency};
pub use draws::PosteriorDraws;
pub use generated::{GeneratedDraws, generated_quantities_draws};
pub use loo::{LooComparison, LooFit, LooResult, PointwiseLoo, loo_compare, psis_loo};
pub use psis::{DEFAULT_K_THRESHOLD, KhatCategory, PsisConfig, PsisResult, PsisWeights, psis, psis_smooth};
