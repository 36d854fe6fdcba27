//! Non-centred site random effects.
//!
//! Each site `j` owns `K` independent standard-normal deviates `z_j`. Its
//! correlated deviation vector is `ε_j = diag(σ)·L_Ω·z_j`, so that
//! `Cov(ε_j) = diag(σ)·Ω·diag(σ)` with `Ω = L_Ω·L_Ωᵀ`.
//!
//! Layouts are row-major: `z` and `ε` are `J × K` (site-major), `L_Ω` is
//! `K × K` lower-triangular.

use fg_ad::Scalar;

/// Correlated, scaled site deviations `ε` (`J × K`, site-major).
pub fn site_deviations<S: Scalar>(z: &[S], l_omega: &[S], sigma: &[S], k: usize) -> Vec<S> {
    debug_assert_eq!(l_omega.len(), k * k);
    debug_assert_eq!(sigma.len(), k);
    debug_assert_eq!(z.len() % k.max(1), 0);
    let mut eps = Vec::with_capacity(z.len());
    for zj in z.chunks_exact(k) {
        for r in 0..k {
            let lz: S = (0..=r).map(|c| l_omega[r * k + c] * zj[c]).sum();
            eps.push(sigma[r] * lz);
        }
    }
    eps
}

/// Invert [`site_deviations`] for one site by forward substitution:
/// `z_j = L_Ω⁻¹ (ε_j / σ)`.
pub fn standardize_deviations(eps: &[f64], l_omega: &[f64], sigma: &[f64], k: usize) -> Vec<f64> {
    let mut z = Vec::with_capacity(eps.len());
    for ej in eps.chunks_exact(k) {
        let start = z.len();
        for r in 0..k {
            let target = ej[r] / sigma[r];
            let partial: f64 = (0..r).map(|c| l_omega[r * k + c] * z[start + c]).sum();
            z.push((target - partial) / l_omega[r * k + r]);
        }
    }
    z
}

/// Implied covariance `diag(σ)·L_Ω·L_Ωᵀ·diag(σ)` (row-major `K × K`).
pub fn implied_covariance(l_omega: &[f64], sigma: &[f64], k: usize) -> Vec<f64> {
    let omega = fg_prob::lkj::corr_from_cholesky(l_omega, k);
    let mut cov = vec![0.0; k * k];
    for r in 0..k {
        for c in 0..k {
            cov[r * k + c] = sigma[r] * omega[r * k + c] * sigma[c];
        }
    }
    cov
}
