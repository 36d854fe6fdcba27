//! Von Bertalanffy growth function.
//!
//! `μ(t) = L0 + (Linf - L0)·(1 - exp(-k·t))`, evaluated as the convex
//! combination `L0·e^{-kt} + Linf·(1 - e^{-kt})` so that positive inputs
//! always give a positive mean (its log is the lognormal location).

use fg_ad::Scalar;

/// Days per year used to convert CMR intervals to growth time.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Expected length at age `t` (years).
#[inline]
pub fn mean_length(l0: f64, linf: f64, k: f64, t: f64) -> f64 {
    mean_length_s(l0, linf, k, t)
}

/// [`mean_length`] for any [`Scalar`] parameters; `t` is data.
#[inline]
pub fn mean_length_s<S: Scalar>(l0: S, linf: S, k: S, t: f64) -> S {
    if t == 0.0 {
        return l0;
    }
    let decay = (-(k * S::from_f64(t))).exp();
    l0 * decay + linf * (S::from_f64(1.0) - decay)
}

/// Expected recapture length of a fish captured at `capture_length` and
/// recaptured `days` later.
#[inline]
pub fn recapture_mean_length(capture_length: f64, linf: f64, k: f64, days: f64) -> f64 {
    recapture_mean_length_s(capture_length, linf, k, days)
}

/// [`recapture_mean_length`] for any [`Scalar`] parameters.
#[inline]
pub fn recapture_mean_length_s<S: Scalar>(capture_length: f64, linf: S, k: S, days: f64) -> S {
    mean_length_s(S::from_f64(capture_length), linf, k, days / DAYS_PER_YEAR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fg_ad::Dual;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_equals_l0_at_zero_and_tends_to_linf() {
        assert_eq!(mean_length(25.0, 250.0, 0.4, 0.0), 25.0);
        assert_relative_eq!(mean_length(25.0, 250.0, 0.4, 200.0), 250.0, epsilon = 1e-9);
        // Closed form at t = 1.
        let expected = 25.0 + 225.0 * (1.0 - (-0.4f64).exp());
        assert_relative_eq!(mean_length(25.0, 250.0, 0.4, 1.0), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_monotone_in_t_for_random_parameters() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let l0 = rng.gen_range(1.0..100.0);
            let linf = l0 + rng.gen_range(1.0..500.0);
            let k = rng.gen_range(0.01..3.0);
            let mut prev = mean_length(l0, linf, k, 0.0);
            for step in 1..200 {
                let t = step as f64 * 0.1;
                let mu = mean_length(l0, linf, k, t);
                // Allow rounding once the curve has saturated.
                assert!(mu >= prev - 1e-12 * linf, "not monotone at t={t}: {mu} < {prev}");
                assert!(mu <= linf * (1.0 + 1e-12));
                prev = mu;
            }
        }
    }

    #[test]
    fn test_recapture_uses_capture_length_and_days() {
        assert_eq!(recapture_mean_length(80.0, 300.0, 0.5, 0.0), 80.0);
        let mu = recapture_mean_length(80.0, 300.0, 0.5, 365.0);
        assert_relative_eq!(mu, mean_length(80.0, 300.0, 0.5, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_dual_derivative_in_k() {
        let (l0, linf, k, t) = (20.0, 200.0, 0.3, 2.0);
        let mu = mean_length_s(Dual::constant(l0), Dual::constant(linf), Dual::var(k), t);
        // dμ/dk = (Linf - L0)·t·exp(-k t)
        assert_relative_eq!(mu.dot, (linf - l0) * t * (-k * t).exp(), epsilon = 1e-10);
    }
}
