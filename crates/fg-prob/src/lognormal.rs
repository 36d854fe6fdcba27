//! LogNormal distribution utilities.
//!
//! `X ~ LogNormal(mu, sigma)` means `ln X ~ Normal(mu, sigma)`; `mu` and
//! `sigma` live on the log scale.

use fg_ad::Scalar;
use fg_core::{Error, Result};

use crate::normal::LN_SQRT_2PI;

/// Log-PDF of `LogNormal(mu, sigma)` at `x`. Returns `-inf` for `x <= 0`.
pub fn logpdf(x: f64, mu: f64, sigma: f64) -> Result<f64> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(Error::Validation(format!("sigma must be finite and > 0, got {}", sigma)));
    }
    Ok(logpdf_s(x, mu, sigma))
}

/// Normalised LogNormal log-PDF for any [`Scalar`] location and scale.
///
/// The observation `x` is data (never differentiated); the caller guarantees
/// `sigma > 0`.
#[inline]
pub fn logpdf_s<S: Scalar>(x: f64, mu: S, sigma: S) -> S {
    if !x.is_finite() || x <= 0.0 {
        return S::from_f64(f64::NEG_INFINITY);
    }
    let lx = x.ln();
    let z = (S::from_f64(lx) - mu) / sigma;
    -S::from_f64(0.5) * z * z - sigma.ln() - S::from_f64(LN_SQRT_2PI + lx)
}

/// CDF of `LogNormal(mu, sigma)` at `x`.
pub fn cdf(x: f64, mu: f64, sigma: f64) -> Result<f64> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(Error::Validation(format!("sigma must be finite and > 0, got {}", sigma)));
    }
    if x <= 0.0 {
        return Ok(0.0);
    }
    let z = (x.ln() - mu) / (sigma * std::f64::consts::SQRT_2);
    Ok(0.5 * statrs::function::erf::erfc(-z))
}
