//! LKJ prior on correlation matrices, evaluated on the Cholesky factor.
//!
//! Matrices are dense row-major `K × K` slices. For a lower-triangular `L`
//! with unit-norm rows, `Ω = L Lᵀ` is a valid correlation matrix.

use fg_ad::Scalar;

/// Whether `l` is the Cholesky factor of a correlation matrix: lower
/// triangular, positive diagonal, and every row of unit Euclidean norm.
pub fn is_cholesky_corr(l: &[f64], k: usize, tol: f64) -> bool {
    if l.len() != k * k || k == 0 {
        return false;
    }
    for i in 0..k {
        if !(l[i * k + i] > 0.0) {
            return false;
        }
        let mut norm2 = 0.0;
        for j in 0..k {
            let v = l[i * k + j];
            if !v.is_finite() || (j > i && v != 0.0) {
                return false;
            }
            norm2 += v * v;
        }
        if (norm2 - 1.0).abs() > tol {
            return false;
        }
    }
    true
}

/// `Ω = L Lᵀ` (row-major).
pub fn corr_from_cholesky(l: &[f64], k: usize) -> Vec<f64> {
    let mut omega = vec![0.0; k * k];
    for i in 0..k {
        for j in 0..=i {
            let s: f64 = (0..=j).map(|c| l[i * k + c] * l[j * k + c]).sum();
            omega[i * k + j] = s;
            omega[j * k + i] = s;
        }
    }
    omega
}

/// Log density of `LKJCorrCholesky(eta)` at `L`, up to a constant in `(K, eta)`.
///
/// `Σ_{d=1}^{K-1} (K - d - 1 + 2(η - 1)) · ln L[d][d]`. The `K - d - 1`
/// part is the Jacobian of `L ↦ L Lᵀ`, so `η = 1` is uniform over
/// correlation matrices and `η > 1` concentrates mass at the identity.
pub fn cholesky_log_kernel<S: Scalar>(l: &[S], k: usize, eta: f64) -> S {
    (1..k)
        .map(|d| {
            let coef = (k - d - 1) as f64 + 2.0 * (eta - 1.0);
            if coef == 0.0 { S::zero() } else { S::from_f64(coef) * l[d * k + d].ln() }
        })
        .sum()
}
