//! MCMC diagnostics: split R-hat, bulk ESS, tail ESS, relative efficiency.
//!
//! This module implements:
//! - Split R-hat (Gelman et al.)
//! - Rank-normalized + folded split R-hat (Vehtari et al. 2021) for robustness
//! - Bulk ESS and tail ESS (Geyer initial monotone sequence on split chains)
//! - Relative efficiency `ESS / S` of a per-draw quantity, the `r_eff` PSIS uses

use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc_inv;

use crate::draws::PosteriorDraws;

/// Per-parameter diagnostics for a set of posterior draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsResult {
    /// Rank-normalized folded split R-hat per parameter.
    pub r_hat: Vec<f64>,
    /// Bulk ESS per parameter.
    pub ess_bulk: Vec<f64>,
    /// Tail ESS per parameter.
    pub ess_tail: Vec<f64>,
}

impl DiagnosticsResult {
    /// Largest finite R-hat (`NaN` if none is finite).
    pub fn max_r_hat(&self) -> f64 {
        self.r_hat.iter().copied().filter(|v| v.is_finite()).fold(f64::NAN, f64::max)
    }

    /// Smallest bulk ESS.
    pub fn min_ess_bulk(&self) -> f64 {
        self.ess_bulk.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

/// Compute split R-hat for one parameter across multiple chains.
///
/// Each chain is split in half, giving 2*M half-chains.
/// R-hat = sqrt((var_hat+ / W)) where var_hat+ = (N-1)/N * W + B/N.
pub fn r_hat(chains: &[&[f64]]) -> f64 {
    if chains.is_empty() {
        return f64::NAN;
    }

    let mut half_chains_raw: Vec<&[f64]> = Vec::new();
    for chain in chains {
        let n = chain.len();
        if n < 4 {
            return f64::NAN;
        }
        let mid = n / 2;
        half_chains_raw.push(&chain[..mid]);
        half_chains_raw.push(&chain[mid..]);
    }

    let min_len = half_chains_raw.iter().map(|c| c.len()).min().unwrap_or(0);
    if min_len < 2 {
        return f64::NAN;
    }
    let half_chains: Vec<&[f64]> = half_chains_raw.iter().map(|c| &c[..min_len]).collect();

    let m = half_chains.len() as f64;
    let n = min_len as f64;

    let chain_means: Vec<f64> =
        half_chains.iter().map(|c| c.iter().sum::<f64>() / c.len() as f64).collect();
    let grand_mean: f64 = chain_means.iter().sum::<f64>() / m;

    // B = n/(m-1) * sum((chain_mean - grand_mean)^2)
    let b: f64 =
        chain_means.iter().map(|&cm| (cm - grand_mean).powi(2)).sum::<f64>() * n / (m - 1.0);

    let w: f64 = half_chains
        .iter()
        .zip(chain_means.iter())
        .map(|(c, &cm)| c.iter().map(|&x| (x - cm).powi(2)).sum::<f64>() / (c.len() as f64 - 1.0))
        .sum::<f64>()
        / m;

    if w < 1e-30 {
        return f64::NAN;
    }

    let var_hat_plus = (n - 1.0) / n * w + b / n;
    (var_hat_plus / w).sqrt()
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let q = q.clamp(0.0, 1.0);
    let n = sorted.len() as f64;
    let pos = q * (n - 1.0);
    let i0 = pos.floor() as usize;
    let i1 = pos.ceil() as usize;
    if i0 == i1 {
        return sorted[i0];
    }
    let f = pos - i0 as f64;
    sorted[i0] * (1.0 - f) + sorted[i1] * f
}

fn sorted_all(chains: &[&[f64]]) -> Vec<f64> {
    let mut all: Vec<f64> = chains.iter().flat_map(|c| c.iter().copied()).collect();
    all.sort_by(|a, b| a.total_cmp(b));
    all
}

fn as_refs(chains: &[Vec<f64>]) -> Vec<&[f64]> {
    chains.iter().map(|c| c.as_slice()).collect()
}

/// Standard normal quantile.
fn normal_quantile(p: f64) -> f64 {
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
}

/// Replace every draw by the normal quantile of its pooled rank
/// (average ranks for ties, `(rank - 0.5)/N` offset).
pub fn rank_normalize(chains: &[&[f64]]) -> Vec<Vec<f64>> {
    let total: usize = chains.iter().map(|c| c.len()).sum();
    let mut out: Vec<Vec<f64>> = chains.iter().map(|c| vec![0.0; c.len()]).collect();
    if total == 0 {
        return out;
    }

    let mut flat: Vec<(f64, usize, usize)> = Vec::with_capacity(total);
    for (ci, chain) in chains.iter().enumerate() {
        for (ti, &x) in chain.iter().enumerate() {
            flat.push((x, ci, ti));
        }
    }
    flat.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = flat.len();
    let mut i = 0usize;
    while i < n {
        let mut j = i + 1;
        while j < n && flat[j].0 == flat[i].0 {
            j += 1;
        }
        let rank = 0.5 * ((i + 1) as f64 + j as f64);
        let p = ((rank - 0.5) / n as f64).clamp(1e-12, 1.0 - 1e-12);
        let z = normal_quantile(p);
        for &(_, ci, ti) in &flat[i..j] {
            out[ci][ti] = z;
        }
        i = j;
    }
    out
}

/// Rank-normalized split R-hat, maximised with the same statistic on the
/// draws folded around the pooled median.
pub fn r_hat_rank_normalized_folded(chains: &[&[f64]]) -> f64 {
    if chains.is_empty() || chains.iter().any(|c| c.len() < 4) {
        return f64::NAN;
    }

    let z = rank_normalize(chains);
    let r_rank = r_hat(&as_refs(&z));

    let all = sorted_all(chains);
    let med = all[all.len() / 2];
    let folded: Vec<Vec<f64>> =
        chains.iter().map(|c| c.iter().map(|&x| (x - med).abs()).collect()).collect();
    let z_fold = rank_normalize(&as_refs(&folded));
    let r_fold = r_hat(&as_refs(&z_fold));

    r_rank.max(r_fold)
}

fn split_chains_for_ess<'a>(chains: &[&'a [f64]]) -> Option<Vec<&'a [f64]>> {
    if chains.is_empty() {
        return None;
    }

    let mut halves: Vec<&[f64]> = Vec::with_capacity(chains.len() * 2);
    for c in chains {
        if c.len() < 4 {
            return None;
        }
        let mid = c.len() / 2;
        halves.push(&c[..mid]);
        halves.push(&c[mid..]);
    }

    let min_len = halves.iter().map(|c| c.len()).min().unwrap_or(0);
    if min_len < 4 {
        return None;
    }
    Some(halves.into_iter().map(|c| &c[..min_len]).collect())
}

fn mean_and_var(chain: &[f64]) -> (f64, f64) {
    let n = chain.len() as f64;
    let mean = chain.iter().sum::<f64>() / n;
    let var = chain.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n.max(2.0) - 1.0);
    (mean, var)
}

/// Effective sample size using a multi-chain initial monotone sequence
/// estimator (Geyer) on variogram-based autocorrelations.
///
/// Returns 0 when the chains are too short to split (fewer than 8 draws).
pub fn ess_bulk(chains: &[&[f64]]) -> f64 {
    let split = match split_chains_for_ess(chains) {
        Some(v) => v,
        None => return 0.0,
    };

    let m = split.len();
    let n = split[0].len();
    let total_draws = (m * n) as f64;

    let (means, vars): (Vec<f64>, Vec<f64>) = split.iter().map(|c| mean_and_var(c)).unzip();
    let m_f = m as f64;
    let n_f = n as f64;
    let mean_all = means.iter().sum::<f64>() / m_f;
    let b = means.iter().map(|&mu| (mu - mean_all).powi(2)).sum::<f64>() * n_f / (m_f - 1.0);
    let w = vars.iter().sum::<f64>() / m_f;
    let var_hat_plus = (n_f - 1.0) / n_f * w + b / n_f;

    if !var_hat_plus.is_finite() || var_hat_plus < 1e-30 {
        return total_draws;
    }

    // rho_t = 1 - V_t / (2 * var_hat_plus), V_t the mean squared lag-t difference.
    let mut rho: Vec<f64> = Vec::with_capacity(n - 1);
    for lag in 1..n {
        let mut sum = 0.0;
        let mut count = 0usize;
        for c in &split {
            for i in 0..(n - lag) {
                let d = c[i] - c[i + lag];
                sum += d * d;
                count += 1;
            }
        }
        let v = sum / (count as f64);
        rho.push((1.0 - v / (2.0 * var_hat_plus)).clamp(-1.0, 1.0));

        let k = rho.len();
        if k % 2 == 0 && rho[k - 2] + rho[k - 1] < 0.0 {
            break;
        }
    }

    let mut gammas: Vec<f64> = Vec::new();
    let mut i = 0usize;
    while i + 1 < rho.len() {
        let g = rho[i] + rho[i + 1];
        if g < 0.0 {
            break;
        }
        gammas.push(g);
        i += 2;
    }
    for k in 1..gammas.len() {
        if gammas[k] > gammas[k - 1] {
            gammas[k] = gammas[k - 1];
        }
    }

    let tau = 1.0 + 2.0 * gammas.iter().sum::<f64>();
    if !tau.is_finite() || tau <= 0.0 {
        return total_draws;
    }
    (total_draws / tau).clamp(1.0, total_draws)
}

/// Bulk ESS of the rank-normalized draws.
pub fn ess_bulk_rank_normalized(chains: &[&[f64]]) -> f64 {
    ess_bulk(&as_refs(&rank_normalize(chains)))
}

/// Tail ESS: `min(ESS(I[x <= q05]), ESS(I[x >= q95]))`.
pub fn ess_tail(chains: &[&[f64]]) -> f64 {
    if chains.is_empty() {
        return 0.0;
    }

    let all = sorted_all(chains);
    let q05 = quantile_sorted(&all, 0.05);
    let q95 = quantile_sorted(&all, 0.95);
    let indicator = |pred: &dyn Fn(f64) -> bool| -> Vec<Vec<f64>> {
        chains
            .iter()
            .map(|c| c.iter().map(|&x| if pred(x) { 1.0 } else { 0.0 }).collect())
            .collect()
    };
    let lower = indicator(&|x| x <= q05);
    let upper = indicator(&|x| x >= q95);

    ess_bulk(&as_refs(&lower)).min(ess_bulk(&as_refs(&upper)))
}

/// Relative efficiency `ESS / S` of a per-draw quantity.
///
/// Falls back to 1 when the chains are too short for an ESS estimate.
pub fn relative_efficiency(chains: &[&[f64]]) -> f64 {
    let total: usize = chains.iter().map(|c| c.len()).sum();
    let ess = ess_bulk(chains);
    if total == 0 || ess.is_nan() || ess <= 0.0 {
        return 1.0;
    }
    ess / total as f64
}

/// Diagnostics for every parameter of a set of draws.
pub fn compute_diagnostics(draws: &PosteriorDraws) -> DiagnosticsResult {
    let n_params = draws.n_params();
    let mut r_hat_vals = Vec::with_capacity(n_params);
    let mut ess_bulk_vals = Vec::with_capacity(n_params);
    let mut ess_tail_vals = Vec::with_capacity(n_params);

    for p in 0..n_params {
        let chain_draws = draws.param_draws(p);
        let refs = as_refs(&chain_draws);
        r_hat_vals.push(r_hat_rank_normalized_folded(&refs));
        ess_bulk_vals.push(ess_bulk_rank_normalized(&refs));
        ess_tail_vals.push(ess_tail(&refs));
    }

    let out = DiagnosticsResult { r_hat: r_hat_vals, ess_bulk: ess_bulk_vals, ess_tail: ess_tail_vals };
    log::debug!(
        "diagnostics: {} params, {} chains, max r_hat={:.3}, min ess_bulk={:.1}",
        n_params,
        draws.n_chains(),
        out.max_r_hat(),
        out.min_ess_bulk()
    );
    out
}
