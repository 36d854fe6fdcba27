//! Natural-scale parameter sets.

use serde::{Deserialize, Serialize};

/// Growth parameters of one site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteGrowth {
    /// Length at age 0 (`None` for the CMR variant, which has no population `L0`).
    pub l0: Option<f64>,
    /// Asymptotic length.
    pub linf: f64,
    /// Growth rate (1/year).
    pub k: f64,
}

/// One parameter draw on the natural (constrained) scale.
///
/// `eps` and `sites` are derived from the other fields; `GrowthModel::pack`
/// and `GrowthModel::log_density_params` ignore them and recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Log-scale intercepts, one per growth component.
    pub b0: Vec<f64>,
    /// Covariate slopes on `log Linf`.
    pub beta_linf: Vec<f64>,
    /// Covariate slopes on `log k`.
    pub beta_k: Vec<f64>,
    /// Random-effect scales `σ_VB`.
    pub sigma_vb: Vec<f64>,
    /// Cholesky factor of the random-effect correlation (row-major `K × K`).
    pub l_omega: Vec<f64>,
    /// Standard-normal site deviates (`J × K`, site-major).
    pub z: Vec<f64>,
    /// Mixture observation scale (log-length sd).
    pub sigma_mix: Option<f64>,
    /// CMR observation scale (log-length sd).
    pub sigma_cmr: Option<f64>,
    /// Class proportions per site (`J` rows of length `A`; empty without a mixture term).
    pub theta: Vec<Vec<f64>>,
    /// Correlated site deviations `ε` (`J × K`, site-major).
    pub eps: Vec<f64>,
    /// Per-site growth parameters.
    pub sites: Vec<SiteGrowth>,
}

impl ModelParams {
    /// Random-effect correlation matrix `Ω = L_Ω·L_Ωᵀ` (row-major).
    pub fn omega(&self) -> Vec<f64> {
        let k = self.sigma_vb.len();
        fg_prob::lkj::corr_from_cholesky(&self.l_omega, k)
    }

    /// Population-level growth parameters `exp(b0)` in component order.
    pub fn global_growth(&self) -> Vec<f64> {
        self.b0.iter().map(|b| b.exp()).collect()
    }
}
