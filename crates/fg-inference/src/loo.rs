//! PSIS-LOO: leave-one-out expected log predictive density.
//!
//! For observation `i` with normalized smoothed weights `w_s`:
//! `elpd_loo_i = log Σ_s w_s p(y_i | θ_s)`, `lpd_i = log mean_s p(y_i | θ_s)`
//! and `p_loo_i = lpd_i - elpd_loo_i`. Totals sum over observations; their
//! standard errors are `sqrt(N · var_i)`.

use fg_core::{DrawMatrix, Error, Result};
use fg_prob::math::{log_mean_exp, log_sum_exp};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::psis::{KhatCategory, PsisConfig, PsisWeights, psis};

/// LOO estimates for one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointwiseLoo {
    /// Leave-one-out expected log predictive density.
    pub elpd_loo: f64,
    /// Monte Carlo standard error of `elpd_loo`.
    pub mcse_elpd_loo: f64,
    /// Effective number of parameters contributed by this observation.
    pub p_loo: f64,
    /// In-sample log predictive density.
    pub lpd: f64,
    /// Pareto shape of the importance ratios.
    pub pareto_k: f64,
    /// `pareto_k` is at or below the reliability threshold.
    pub reliable: bool,
}

impl PointwiseLoo {
    /// k̂ band.
    pub fn category(&self) -> KhatCategory {
        KhatCategory::from_khat(self.pareto_k)
    }
}

/// PSIS-LOO summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LooResult {
    /// Per-observation estimates, in observation order.
    pub pointwise: Vec<PointwiseLoo>,
    /// Sum of pointwise `elpd_loo`.
    pub elpd_loo: f64,
    /// Standard error of `elpd_loo`.
    pub se_elpd_loo: f64,
    /// Monte Carlo standard error of `elpd_loo`.
    pub mcse_elpd_loo: f64,
    /// Effective number of parameters.
    pub p_loo: f64,
    /// Standard error of `p_loo`.
    pub se_p_loo: f64,
    /// `-2 · elpd_loo`.
    pub looic: f64,
    /// Standard error of `looic`.
    pub se_looic: f64,
    /// Number of posterior draws used.
    pub n_draws: usize,
    /// k̂ reliability threshold used for `reliable`.
    pub k_threshold: f64,
    /// Observations whose k̂ exceeds the threshold.
    pub flagged: Vec<usize>,
}

impl LooResult {
    /// Number of observations.
    pub fn n_obs(&self) -> usize {
        self.pointwise.len()
    }

    /// Pointwise `elpd_loo` values.
    pub fn elpd_pointwise(&self) -> Vec<f64> {
        self.pointwise.iter().map(|p| p.elpd_loo).collect()
    }

    /// Number of observations in each k̂ band, ordered good, ok, bad, very bad.
    pub fn category_counts(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for p in &self.pointwise {
            let idx = match p.category() {
                KhatCategory::Good => 0,
                KhatCategory::Ok => 1,
                KhatCategory::Bad => 2,
                KhatCategory::VeryBad => 3,
            };
            counts[idx] += 1;
        }
        counts
    }
}

/// LOO summary together with the weights it was computed from
/// (reused by LOO-PIT).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LooFit {
    /// Estimates.
    pub result: LooResult,
    /// Smoothed importance weights.
    pub weights: PsisWeights,
}

/// Sum and `sqrt(N · sample variance)`; the error is 0 for fewer than two values.
fn sum_and_se(xs: &[f64]) -> (f64, f64) {
    let n = xs.len();
    let sum: f64 = xs.iter().sum();
    if n < 2 {
        return (sum, 0.0);
    }
    let mean = sum / n as f64;
    let var = xs.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    (sum, (n as f64 * var).sqrt())
}

fn pointwise_estimate(ll: &[f64], lw: &[f64], r_eff: f64, pareto_k: f64, threshold: f64) -> PointwiseLoo {
    let terms: Vec<f64> = lw.iter().zip(ll).map(|(w, l)| w + l).collect();
    let elpd_loo = log_sum_exp(&terms);
    let lpd = log_mean_exp(ll);

    // Delta method on the scaled predictive densities.
    let m = ll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let e: Vec<f64> = ll.iter().map(|&l| (l - m).exp()).collect();
    let e_mean: f64 = lw.iter().zip(&e).map(|(w, x)| w.exp() * x).sum();
    let var: f64 = lw.iter().zip(&e).map(|(w, x)| (2.0 * w).exp() * (x - e_mean).powi(2)).sum();
    let mcse_elpd_loo = (var / r_eff).sqrt() / e_mean;

    PointwiseLoo {
        elpd_loo,
        mcse_elpd_loo,
        p_loo: lpd - elpd_loo,
        lpd,
        pareto_k,
        reliable: pareto_k <= threshold,
    }
}

/// LOO estimates from a log-likelihood matrix and its smoothed weights.
pub fn loo_from_weights(log_lik: &DrawMatrix, weights: &PsisWeights) -> Result<LooResult> {
    if log_lik.n_draws() != weights.n_draws() || log_lik.n_obs() != weights.n_obs() {
        return Err(Error::Validation(format!(
            "weights are {} x {}, log-likelihood is {} x {}",
            weights.n_draws(),
            weights.n_obs(),
            log_lik.n_draws(),
            log_lik.n_obs()
        )));
    }
    let n = log_lik.n_obs();
    let pointwise: Vec<PointwiseLoo> = (0..n)
        .into_par_iter()
        .map(|i| {
            pointwise_estimate(
                &log_lik.column(i),
                &weights.column(i),
                weights.r_eff[i],
                weights.pareto_k[i],
                weights.k_threshold,
            )
        })
        .collect();

    let elpd: Vec<f64> = pointwise.iter().map(|p| p.elpd_loo).collect();
    let p: Vec<f64> = pointwise.iter().map(|p| p.p_loo).collect();
    let (elpd_loo, se_elpd_loo) = sum_and_se(&elpd);
    let (p_loo, se_p_loo) = sum_and_se(&p);
    let mcse_elpd_loo = pointwise.iter().map(|p| p.mcse_elpd_loo.powi(2)).sum::<f64>().sqrt();
    let flagged: Vec<usize> = (0..n).filter(|&i| !pointwise[i].reliable).collect();

    if !flagged.is_empty() {
        log::warn!(
            "{} of {} observations have Pareto k above {:.2}; their PSIS-LOO estimates are unreliable",
            flagged.len(),
            n,
            weights.k_threshold
        );
    }
    log::debug!("psis-loo: elpd_loo={:.3} se={:.3} p_loo={:.3}", elpd_loo, se_elpd_loo, p_loo);

    Ok(LooResult {
        pointwise,
        elpd_loo,
        se_elpd_loo,
        mcse_elpd_loo,
        p_loo,
        se_p_loo,
        looic: -2.0 * elpd_loo,
        se_looic: 2.0 * se_elpd_loo,
        n_draws: log_lik.n_draws(),
        k_threshold: weights.k_threshold,
        flagged,
    })
}

/// PSIS-LOO from a draws × observations log-likelihood matrix.
///
/// Relative efficiencies come from the matrix's chain ids.
pub fn psis_loo(log_lik: &DrawMatrix, config: &PsisConfig) -> Result<LooFit> {
    let weights = psis(log_lik, None, config)?;
    let result = loo_from_weights(log_lik, &weights)?;
    Ok(LooFit { result, weights })
}

/// Difference between two LOO results on the same observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LooComparison {
    /// `elpd_loo(a) - elpd_loo(b)`; positive favours `a`.
    pub elpd_diff: f64,
    /// Standard error of the pointwise differences.
    pub se_diff: f64,
}

/// Compare two models fitted to the same observations.
pub fn loo_compare(a: &LooResult, b: &LooResult) -> Result<LooComparison> {
    if a.n_obs() != b.n_obs() {
        return Err(Error::Validation(format!(
            "cannot compare LOO results over {} and {} observations",
            a.n_obs(),
            b.n_obs()
        )));
    }
    if a.n_obs() == 0 {
        return Err(Error::Validation("cannot compare empty LOO results".into()));
    }
    let diffs: Vec<f64> =
        a.pointwise.iter().zip(&b.pointwise).map(|(x, y)| x.elpd_loo - y.elpd_loo).collect();
    let (elpd_diff, se_diff) = sum_and_se(&diffs);
    Ok(LooComparison { elpd_diff, se_diff })
}
