//! Normal distribution utilities.

use fg_ad::Scalar;
use fg_core::{Error, Result};

/// Natural log of `sqrt(2π)`.
pub const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// Log-PDF of a Normal distribution `N(mu, sigma)` at `x`.
///
/// `log p(x) = -0.5 * ((x-mu)/sigma)^2 - ln(sigma) - ln(sqrt(2π))`
pub fn logpdf(x: f64, mu: f64, sigma: f64) -> Result<f64> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(Error::Validation(format!("sigma must be finite and > 0, got {}", sigma)));
    }
    let z = (x - mu) / sigma;
    Ok(-0.5 * z * z - sigma.ln() - LN_SQRT_2PI)
}

/// Normalised Normal log-PDF for any [`Scalar`]; the caller guarantees `sigma > 0`.
#[inline]
pub fn logpdf_s<S: Scalar>(x: S, mu: S, sigma: S) -> S {
    let z = (x - mu) / sigma;
    -S::from_f64(0.5) * z * z - sigma.ln() - S::from_f64(LN_SQRT_2PI)
}
