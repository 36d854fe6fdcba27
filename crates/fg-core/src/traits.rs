//! Core traits for FishGrowth
//!
//! These traits are the boundary between the model layer and whatever
//! inference engine drives it. The engine only ever sees a flat,
//! unconstrained parameter vector; how draws are produced is its business.

use rand::RngCore;

use crate::types::GeneratedDraw;
use crate::Result;

/// Prepared negative log-density evaluator.
///
/// Some models can precompute constants (observations, constraints, etc.)
/// to speed up repeated evaluations. Engines should prefer
/// `prepared().nll(...)` when available.
pub trait PreparedNll: Send + Sync {
    /// Compute the negative log density at `params`.
    fn nll(&self, params: &[f64]) -> Result<f64>;
}

/// Default prepared wrapper that forwards to the model's `nll`.
#[derive(Debug, Clone, Copy)]
pub struct PreparedModelRef<'a, M: LogDensityModel + ?Sized> {
    model: &'a M,
}

impl<'a, M: LogDensityModel + ?Sized> PreparedModelRef<'a, M> {
    /// Create a new prepared wrapper that forwards `nll` to the model.
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }
}

impl<'a, M: LogDensityModel + ?Sized> PreparedNll for PreparedModelRef<'a, M> {
    fn nll(&self, params: &[f64]) -> Result<f64> {
        self.model.nll(params)
    }
}

/// Log-density interface queried repeatedly by an external inference engine.
///
/// `nll` is the negative log density (prior + likelihood + log-Jacobian) of
/// the unconstrained vector. A structurally invalid proposal yields
/// `Ok(f64::INFINITY)` so that the engine can reject it; `Err` is reserved for
/// malformed calls (wrong length) and numerical bugs.
pub trait LogDensityModel: Send + Sync {
    /// Prepared evaluator type (can cache constants).
    ///
    /// If a model has nothing to cache, use:
    /// `type Prepared<'a> = PreparedModelRef<'a, Self> where Self: 'a;`
    type Prepared<'a>: PreparedNll + 'a
    where
        Self: 'a;

    /// Number of parameters.
    fn dim(&self) -> usize;

    /// Parameter names (stable order).
    fn parameter_names(&self) -> Vec<String>;

    /// Parameter bounds (min, max) (stable order).
    fn parameter_bounds(&self) -> Vec<(f64, f64)>;

    /// Suggested initial values (stable order).
    fn parameter_init(&self) -> Vec<f64>;

    /// Negative log density.
    fn nll(&self, params: &[f64]) -> Result<f64>;

    /// Gradient of `nll`.
    fn grad_nll(&self, params: &[f64]) -> Result<Vec<f64>>;

    /// Create a prepared evaluator.
    fn prepared(&self) -> Self::Prepared<'_>;

    /// Compute `nll` and its gradient together, optionally using prepared caches.
    fn nll_grad_prepared(
        &self,
        prepared: &Self::Prepared<'_>,
        params: &[f64],
    ) -> Result<(f64, Vec<f64>)> {
        Ok((prepared.nll(params)?, self.grad_nll(params)?))
    }
}

/// Posterior-predictive interface: one draw in, replicated data and
/// per-observation log-likelihood out.
pub trait GeneratedQuantities: LogDensityModel {
    /// Number of observations in the concatenated observation order.
    fn n_observations(&self) -> usize;

    /// Observed values in the same order as [`GeneratedDraw::y_rep`].
    fn observed(&self) -> Vec<f64>;

    /// Generated quantities for one unconstrained draw.
    fn generated_quantities(
        &self,
        params: &[f64],
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedDraw>;
}
