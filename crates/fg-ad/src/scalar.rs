//! [`Scalar`] trait: abstraction over `f64` and [`Dual`](crate::dual::Dual)
//! so a log density is written once and reused for both evaluation and
//! forward-mode gradients.

use crate::dual::Dual;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A scalar type suitable for log-density computation.
///
/// `Send + Sync` so that per-observation terms can be reduced in parallel.
pub trait Scalar:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Sum
    + PartialOrd
    + Send
    + Sync
    + Sized
    + 'static
{
    /// Wrap an `f64` constant (derivative = 0 for AD types).
    fn from_f64(v: f64) -> Self;

    /// Extract the primal value.
    fn value(&self) -> f64;

    /// Natural logarithm.
    fn ln(self) -> Self;

    /// `ln(1 + x)`.
    fn ln_1p(self) -> Self;

    /// Exponential.
    fn exp(self) -> Self;

    /// Square root.
    fn sqrt(self) -> Self;

    /// Hyperbolic tangent.
    fn tanh(self) -> Self;

    /// Integer power.
    fn powi(self, n: i32) -> Self;

    /// Absolute value.
    fn abs(self) -> Self;

    /// Additive identity.
    #[inline]
    fn zero() -> Self {
        Self::from_f64(0.0)
    }
}

impl Scalar for f64 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }

    #[inline]
    fn ln_1p(self) -> Self {
        f64::ln_1p(self)
    }

    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn tanh(self) -> Self {
        f64::tanh(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }

    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }
}

impl Scalar for Dual {
    #[inline]
    fn from_f64(v: f64) -> Self {
        Dual::constant(v)
    }

    #[inline]
    fn value(&self) -> f64 {
        self.val
    }

    #[inline]
    fn ln(self) -> Self {
        Dual::ln(self)
    }

    #[inline]
    fn ln_1p(self) -> Self {
        Dual::ln_1p(self)
    }

    #[inline]
    fn exp(self) -> Self {
        Dual::exp(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        Dual::sqrt(self)
    }

    #[inline]
    fn tanh(self) -> Self {
        Dual::tanh(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        Dual::powi(self, n)
    }

    #[inline]
    fn abs(self) -> Self {
        Dual::abs(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Generic lognormal log-density kernel, as used by the growth likelihoods.
    fn lognormal_kernel<S: Scalar>(y: f64, log_mu: S, sigma: S) -> S {
        let z = (S::from_f64(y.ln()) - log_mu) / sigma;
        -S::from_f64(0.5) * z * z - sigma.ln()
    }

    #[test]
    fn test_scalar_f64_matches_closed_form() {
        let v: f64 = lognormal_kernel(30.0, 3.0, 0.2);
        let z = (30.0f64.ln() - 3.0) / 0.2;
        assert_relative_eq!(v, -0.5 * z * z - 0.2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_scalar_dual_gradient_in_location() {
        // d/dm [-0.5 ((ln y - m)/s)^2] = (ln y - m) / s^2
        let m = Dual::var(3.0);
        let s = Dual::constant(0.2);
        let v = lognormal_kernel(30.0, m, s);
        assert_relative_eq!(v.dot, (30.0f64.ln() - 3.0) / 0.04, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_is_additive_identity() {
        let x = Dual::new(2.0, 1.5);
        assert_eq!(x + Dual::zero(), x);
        assert_eq!(<f64 as Scalar>::zero(), 0.0);
    }
}
