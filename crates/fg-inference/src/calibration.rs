//! LOO-PIT calibration.
//!
//! `pit_i = Σ_s w_is · 1[y_rep_si <= y_i]` with the smoothed leave-one-out
//! weights `w_is`. For a calibrated model the values are close to uniform on
//! `[0, 1]`; the helpers here compare their ECDF with the uniform one.

use fg_core::{DrawMatrix, Error, Result};
use fg_prob::math::log_sum_exp;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::psis::PsisWeights;

/// LOO-PIT value of every observation.
///
/// `y_rep` and `log_weights` are draws × observations with the same shape;
/// each weight column must be normalized.
pub fn loo_pit(y_obs: &[f64], y_rep: &DrawMatrix, log_weights: &DrawMatrix) -> Result<Vec<f64>> {
    let n = y_obs.len();
    if y_rep.n_obs() != n || log_weights.n_obs() != n {
        return Err(Error::Validation(format!(
            "{} observations, but y_rep has {} and weights have {}",
            n,
            y_rep.n_obs(),
            log_weights.n_obs()
        )));
    }
    if y_rep.n_draws() != log_weights.n_draws() || y_rep.n_draws() == 0 {
        return Err(Error::Validation(format!(
            "y_rep has {} draws, weights have {}",
            y_rep.n_draws(),
            log_weights.n_draws()
        )));
    }

    let pit = (0..n)
        .map(|i| {
            let below: Vec<f64> = (0..y_rep.n_draws())
                .filter(|&s| y_rep.get(s, i) <= y_obs[i])
                .map(|s| log_weights.get(s, i))
                .collect();
            log_sum_exp(&below).exp().clamp(0.0, 1.0)
        })
        .collect();
    Ok(pit)
}

/// [`loo_pit`] with the weights of a PSIS fit.
pub fn loo_pit_psis(y_obs: &[f64], y_rep: &DrawMatrix, weights: &PsisWeights) -> Result<Vec<f64>> {
    loo_pit(y_obs, y_rep, &weights.log_weights)
}

/// `F_n(g) - g` at each grid point, `F_n` the ECDF of `pit`.
pub fn ecdf_difference(pit: &[f64], grid: &[f64]) -> Vec<f64> {
    let mut sorted = pit.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len().max(1) as f64;
    grid.iter()
        .map(|&g| {
            let below = sorted.partition_point(|&u| u <= g);
            below as f64 / n - g
        })
        .collect()
}

/// `n_points` equally spaced points from 0 to 1 inclusive.
pub fn uniform_grid(n_points: usize) -> Vec<f64> {
    if n_points < 2 {
        return vec![0.0, 1.0];
    }
    (0..n_points).map(|i| i as f64 / (n_points - 1) as f64).collect()
}

/// Kolmogorov-Smirnov test of uniformity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsTest {
    /// `sup |F_n(u) - u|`.
    pub statistic: f64,
    /// Asymptotic p-value after Stephens' correction.
    pub p_value: f64,
    /// Number of values tested.
    pub n: usize,
}

/// Kolmogorov survival function `Q(t) = 2 Σ (-1)^{j-1} exp(-2 j² t²)`.
pub fn kolmogorov_q(t: f64) -> f64 {
    const EPS1: f64 = 1e-3;
    const EPS2: f64 = 1e-8;
    if t <= 0.0 {
        return 1.0;
    }
    let a2 = -2.0 * t * t;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut prev = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = fac * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= EPS1 * prev || term.abs() <= EPS2 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        prev = term.abs();
    }
    // The series only fails to converge for tiny t.
    1.0
}

/// One-sample KS test of `pit` against Uniform(0, 1).
pub fn ks_uniform(pit: &[f64]) -> Result<KsTest> {
    let n = pit.len();
    if n == 0 {
        return Err(Error::Validation("KS test needs at least one value".into()));
    }
    if let Some(u) = pit.iter().find(|u| !(0.0..=1.0).contains(*u)) {
        return Err(Error::Validation(format!("PIT value {} is outside [0, 1]", u)));
    }
    let mut sorted = pit.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let nf = n as f64;
    let statistic = sorted
        .iter()
        .enumerate()
        .map(|(i, &u)| {
            let above = (i + 1) as f64 / nf - u;
            let below = u - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0, f64::max);
    let sqrt_n = nf.sqrt();
    let p_value = kolmogorov_q((sqrt_n + 0.12 + 0.11 / sqrt_n) * statistic);
    Ok(KsTest { statistic, p_value, n })
}

/// Pointwise simulated band for the ECDF difference of `n` uniform values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformEnvelope {
    /// Evaluation grid.
    pub grid: Vec<f64>,
    /// Lower band per grid point.
    pub lower: Vec<f64>,
    /// Upper band per grid point.
    pub upper: Vec<f64>,
    /// Central probability covered at each grid point.
    pub prob: f64,
}

impl UniformEnvelope {
    /// Grid points where `diff` leaves the band.
    pub fn outside(&self, diff: &[f64]) -> Vec<usize> {
        diff.iter()
            .enumerate()
            .filter(|&(g, &d)| d < self.lower[g] || d > self.upper[g])
            .map(|(g, _)| g)
            .collect()
    }
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let (i0, i1) = (pos.floor() as usize, pos.ceil() as usize);
    let f = pos - i0 as f64;
    sorted[i0] * (1.0 - f) + sorted[i1] * f
}

/// Simulate `n_sims` samples of `n` uniforms and take central `prob`
/// quantiles of their ECDF difference at each grid point.
pub fn uniform_envelope<R: Rng + ?Sized>(
    n: usize,
    grid: &[f64],
    n_sims: usize,
    prob: f64,
    rng: &mut R,
) -> Result<UniformEnvelope> {
    if n == 0 || n_sims < 2 {
        return Err(Error::Validation(format!(
            "envelope needs n >= 1 and n_sims >= 2, got n={} n_sims={}",
            n, n_sims
        )));
    }
    if !(prob > 0.0 && prob < 1.0) {
        return Err(Error::Validation(format!("prob must be in (0, 1), got {}", prob)));
    }
    let unif = Uniform::new(0.0, 1.0);
    let mut by_grid: Vec<Vec<f64>> = vec![Vec::with_capacity(n_sims); grid.len()];
    for _ in 0..n_sims {
        let u: Vec<f64> = (0..n).map(|_| unif.sample(rng)).collect();
        for (g, d) in ecdf_difference(&u, grid).into_iter().enumerate() {
            by_grid[g].push(d);
        }
    }
    let (lo_q, hi_q) = ((1.0 - prob) / 2.0, (1.0 + prob) / 2.0);
    let mut lower = Vec::with_capacity(grid.len());
    let mut upper = Vec::with_capacity(grid.len());
    for sims in &mut by_grid {
        sims.sort_by(|a, b| a.total_cmp(b));
        lower.push(quantile_sorted(sims, lo_q));
        upper.push(quantile_sorted(sims, hi_q));
    }
    Ok(UniformEnvelope { grid: grid.to_vec(), lower, upper, prob })
}
