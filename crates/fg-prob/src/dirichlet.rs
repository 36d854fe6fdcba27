//! Dirichlet distribution on the probability simplex.

use fg_ad::Scalar;
use fg_core::{Error, Result};
use statrs::function::gamma::ln_gamma;

/// Default tolerance for simplex checks.
pub const SIMPLEX_TOL: f64 = 1e-8;

/// Whether `theta` is a simplex: every entry finite and `> 0`, sum within `tol` of 1.
pub fn is_simplex(theta: &[f64], tol: f64) -> bool {
    !theta.is_empty()
        && theta.iter().all(|&p| p.is_finite() && p > 0.0)
        && (theta.iter().sum::<f64>() - 1.0).abs() <= tol
}

/// Validate a concentration vector: non-empty, finite, strictly positive.
pub fn validate_alpha(alpha: &[f64]) -> Result<()> {
    if alpha.len() < 2 {
        return Err(Error::Validation(format!(
            "Dirichlet alpha needs at least 2 components, got {}",
            alpha.len()
        )));
    }
    for (i, &a) in alpha.iter().enumerate() {
        if !a.is_finite() || a <= 0.0 {
            return Err(Error::Validation(format!(
                "Dirichlet alpha[{}] must be finite and > 0, got {}",
                i, a
            )));
        }
    }
    Ok(())
}

/// `ln Γ(Σα) - Σ ln Γ(α_a)`.
pub fn log_normalizer(alpha: &[f64]) -> f64 {
    let total: f64 = alpha.iter().sum();
    ln_gamma(total) - alpha.iter().map(|&a| ln_gamma(a)).sum::<f64>()
}

/// Unnormalised log density `Σ (α_a - 1) ln θ_a` for any [`Scalar`].
pub fn log_kernel<S: Scalar>(theta: &[S], alpha: &[f64]) -> S {
    theta
        .iter()
        .zip(alpha)
        .filter(|&(_, &a)| a != 1.0)
        .map(|(&t, &a)| S::from_f64(a - 1.0) * t.ln())
        .sum()
}

/// Normalised log-PDF. Returns `-inf` when `theta` is not a simplex.
pub fn logpdf(theta: &[f64], alpha: &[f64]) -> Result<f64> {
    validate_alpha(alpha)?;
    if theta.len() != alpha.len() {
        return Err(Error::Validation(format!(
            "theta has {} components, alpha has {}",
            theta.len(),
            alpha.len()
        )));
    }
    if !is_simplex(theta, SIMPLEX_TOL) {
        return Ok(f64::NEG_INFINITY);
    }
    Ok(log_normalizer(alpha) + log_kernel(theta, alpha))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_dirichlet_is_constant() {
        // Dirichlet(1,1,1) is uniform with density Γ(3) = 2 on the 2-simplex.
        let a = [1.0, 1.0, 1.0];
        let lp1 = logpdf(&[0.2, 0.3, 0.5], &a).unwrap();
        let lp2 = logpdf(&[0.9, 0.05, 0.05], &a).unwrap();
        assert_relative_eq!(lp1, 2f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(lp1, lp2, epsilon = 1e-12);
    }

    #[test]
    fn test_two_component_matches_beta() {
        // Dirichlet(a, b) on (p, 1-p) is Beta(a, b).
        let (a, b, p) = (2.5f64, 4.0f64, 0.3f64);
        let beta_lp = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b)
            + (a - 1.0) * p.ln()
            + (b - 1.0) * (1.0 - p).ln();
        assert_relative_eq!(logpdf(&[p, 1.0 - p], &[a, b]).unwrap(), beta_lp, epsilon = 1e-10);
    }

    #[test]
    fn test_non_simplex_is_neg_inf() {
        let a = [2.0, 2.0];
        assert_eq!(logpdf(&[0.5, 0.6], &a).unwrap(), f64::NEG_INFINITY);
        assert_eq!(logpdf(&[1.0, 0.0], &a).unwrap(), f64::NEG_INFINITY);
        assert!(logpdf(&[0.5, 0.5], &[2.0, 0.0]).is_err());
        assert!(logpdf(&[0.5, 0.5], &[1.0, 1.0, 1.0]).is_err());
    }
}
