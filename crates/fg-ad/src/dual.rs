//! Forward-mode automatic differentiation via dual numbers.
//!
//! A dual number `Dual { val, dot }` carries a value and its derivative with
//! respect to one seeded input. A full gradient takes one evaluation per input,
//! each seeding a different coordinate with `dot = 1.0`.

use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A dual number for forward-mode AD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual {
    /// Primal value.
    pub val: f64,
    /// Tangent (derivative) value.
    pub dot: f64,
}

impl Dual {
    /// A constant (derivative = 0).
    #[inline]
    pub fn constant(val: f64) -> Self {
        Self { val, dot: 0.0 }
    }

    /// The seeded input variable (derivative = 1).
    #[inline]
    pub fn var(val: f64) -> Self {
        Self { val, dot: 1.0 }
    }

    /// A dual with explicit tangent.
    #[inline]
    pub fn new(val: f64, dot: f64) -> Self {
        Self { val, dot }
    }

    /// `ln(x)`, derivative `1/x`.
    #[inline]
    pub fn ln(self) -> Self {
        Self { val: self.val.ln(), dot: self.dot / self.val }
    }

    /// `ln(1 + x)`, derivative `1/(1+x)`.
    #[inline]
    pub fn ln_1p(self) -> Self {
        Self { val: self.val.ln_1p(), dot: self.dot / (1.0 + self.val) }
    }

    /// `exp(x)`.
    #[inline]
    pub fn exp(self) -> Self {
        let e = self.val.exp();
        Self { val: e, dot: self.dot * e }
    }

    /// `sqrt(x)`, derivative `1/(2 sqrt(x))`.
    #[inline]
    pub fn sqrt(self) -> Self {
        let s = self.val.sqrt();
        Self { val: s, dot: self.dot / (2.0 * s) }
    }

    /// `tanh(x)`, derivative `1 - tanh(x)^2`.
    #[inline]
    pub fn tanh(self) -> Self {
        let t = self.val.tanh();
        Self { val: t, dot: self.dot * (1.0 - t * t) }
    }

    /// Integer power.
    #[inline]
    pub fn powi(self, n: i32) -> Self {
        Self { val: self.val.powi(n), dot: self.dot * (n as f64) * self.val.powi(n - 1) }
    }

    /// `|x|`, derivative `sign(x)`.
    #[inline]
    pub fn abs(self) -> Self {
        Self { val: self.val.abs(), dot: self.dot * self.val.signum() }
    }
}

impl Add for Dual {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self { val: self.val + rhs.val, dot: self.dot + rhs.dot }
    }
}

impl Sub for Dual {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self { val: self.val - rhs.val, dot: self.dot - rhs.dot }
    }
}

impl Mul for Dual {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self { val: self.val * rhs.val, dot: self.dot * rhs.val + self.val * rhs.dot }
    }
}

impl Div for Dual {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self {
            val: self.val / rhs.val,
            dot: (self.dot * rhs.val - self.val * rhs.dot) / (rhs.val * rhs.val),
        }
    }
}

impl Neg for Dual {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self { val: -self.val, dot: -self.dot }
    }
}

impl Sum for Dual {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Dual::constant(0.0), |acc, x| acc + x)
    }
}

impl From<f64> for Dual {
    fn from(val: f64) -> Self {
        Self::constant(val)
    }
}

impl PartialOrd for Dual {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.val.partial_cmp(&other.val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_and_var_seeds() {
        assert_eq!(Dual::constant(5.0).dot, 0.0);
        assert_eq!(Dual::var(3.0).dot, 1.0);
    }

    #[test]
    fn test_product_and_quotient_rules() {
        let x = Dual::var(3.0);
        let y = x * x * Dual::constant(2.0);
        assert_relative_eq!(y.dot, 12.0, epsilon = 1e-12);

        // d/dx (1 / x) = -1/x^2
        let q = Dual::constant(1.0) / x;
        assert_relative_eq!(q.dot, -1.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transcendental_derivatives() {
        let x = Dual::var(0.7);
        assert_relative_eq!(x.ln().dot, 1.0 / 0.7, epsilon = 1e-12);
        assert_relative_eq!(x.ln_1p().dot, 1.0 / 1.7, epsilon = 1e-12);
        assert_relative_eq!(x.exp().dot, 0.7f64.exp(), epsilon = 1e-12);
        assert_relative_eq!(x.sqrt().dot, 0.5 / 0.7f64.sqrt(), epsilon = 1e-12);
        let t = 0.7f64.tanh();
        assert_relative_eq!(x.tanh().dot, 1.0 - t * t, epsilon = 1e-12);
        assert_relative_eq!(x.powi(3).dot, 3.0 * 0.49, epsilon = 1e-12);
        assert_relative_eq!((-x).abs().dot, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_chain_rule_matches_finite_difference() {
        // f(x) = ln(1 + exp(tanh(x)) * sqrt(x))
        let f = |x: f64| (1.0 + x.tanh().exp() * x.sqrt()).ln();
        let x0 = 1.3;
        let d = (Dual::var(x0).tanh().exp() * Dual::var(x0).sqrt()).ln_1p();
        let eps = 1e-6;
        let fd = (f(x0 + eps) - f(x0 - eps)) / (2.0 * eps);
        assert_relative_eq!(d.val, f(x0), epsilon = 1e-12);
        assert_relative_eq!(d.dot, fd, epsilon = 1e-7);
    }

    #[test]
    fn test_sum_accumulates_tangents() {
        let xs = [Dual::new(1.0, 0.5), Dual::new(2.0, 0.25), Dual::constant(3.0)];
        let s: Dual = xs.into_iter().sum();
        assert_eq!(s.val, 6.0);
        assert_eq!(s.dot, 0.75);
    }
}
