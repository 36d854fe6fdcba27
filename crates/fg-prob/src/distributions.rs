//! Prior log-density kernels.
//!
//! These are the terms a sampler target accumulates: additive constants that
//! depend only on fixed hyperparameters are dropped. Fully normalised
//! densities live in the per-distribution modules.

use fg_ad::Scalar;

/// Normal kernel `-0.5 * ((x - mu) / sd)^2` with fixed `mu`, `sd`.
#[inline]
pub fn normal_kernel<S: Scalar>(x: S, mu: f64, sd: f64) -> S {
    let z = (x - S::from_f64(mu)) / S::from_f64(sd);
    -S::from_f64(0.5) * z * z
}

/// Standard-normal kernel summed over a slice: `-0.5 * sum(z^2)`.
#[inline]
pub fn std_normal_kernel<S: Scalar>(z: &[S]) -> S {
    let ss: S = z.iter().map(|&v| v * v).sum();
    -S::from_f64(0.5) * ss
}

/// Half-normal kernel on `x > 0` with fixed `scale`: `-0.5 * (x / scale)^2`.
///
/// The support restriction is enforced by the positive transform upstream;
/// this kernel is only evaluated for `x > 0`.
#[inline]
pub fn half_normal_kernel<S: Scalar>(x: S, scale: f64) -> S {
    let z = x / S::from_f64(scale);
    -S::from_f64(0.5) * z * z
}

/// Normalised half-normal log-PDF; `-inf` outside `x >= 0`.
pub fn half_normal_logpdf(x: f64, scale: f64) -> f64 {
    if x < 0.0 || !x.is_finite() {
        return f64::NEG_INFINITY;
    }
    let z = x / scale;
    -0.5 * z * z - scale.ln() + 0.5 * (2.0 / std::f64::consts::PI).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fg_ad::Dual;

    #[test]
    fn test_kernels_differ_from_logpdf_by_constant() {
        let a = normal_kernel(1.0, 0.5, 2.0) - crate::normal::logpdf(1.0, 0.5, 2.0).unwrap();
        let b = normal_kernel(-3.0, 0.5, 2.0) - crate::normal::logpdf(-3.0, 0.5, 2.0).unwrap();
        assert_relative_eq!(a, b, epsilon = 1e-12);

        let c = half_normal_kernel(0.3, 1.5) - half_normal_logpdf(0.3, 1.5);
        let d = half_normal_kernel(2.5, 1.5) - half_normal_logpdf(2.5, 1.5);
        assert_relative_eq!(c, d, epsilon = 1e-12);
    }

    #[test]
    fn test_half_normal_integrates_to_one() {
        let scale = 0.7;
        let h = 1e-4;
        let total: f64 = (0..100_000)
            .map(|i| half_normal_logpdf((i as f64 + 0.5) * h, scale).exp() * h)
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-6);
        assert_eq!(half_normal_logpdf(-0.1, scale), f64::NEG_INFINITY);
    }

    #[test]
    fn test_std_normal_kernel_gradient() {
        let z = [Dual::var(1.5), Dual::constant(-2.0)];
        let k = std_normal_kernel(&z);
        assert_relative_eq!(k.val, -0.5 * (2.25 + 4.0), epsilon = 1e-12);
        assert_relative_eq!(k.dot, -1.5, epsilon = 1e-12);
    }
}
