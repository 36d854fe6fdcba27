//! Pareto-smoothed importance sampling (Vehtari, Simpson, Gelman, Yao & Gabry).
//!
//! Leave-one-out importance ratios are `r_s ∝ 1 / p(y_i | θ_s)`. The largest
//! `M` ratios of each observation are replaced by expected order statistics
//! of a generalized Pareto distribution fitted to them; the fitted shape `k̂`
//! doubles as a reliability diagnostic.

use std::fmt;

use fg_core::{DrawMatrix, Error, Result};
use fg_prob::math::log_sum_exp;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::diagnostics::relative_efficiency;

/// Default k̂ reliability threshold.
pub const DEFAULT_K_THRESHOLD: f64 = 0.7;

/// PSIS settings.
///
/// By default an observation is flagged when `k̂ > 0.7`. Setting
/// `sample_size_threshold` switches to the stricter [`khat_threshold`] rule,
/// which is below 0.7 for fewer than about 2150 draws. An explicit
/// `k_threshold` overrides both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsisConfig {
    /// Fixed k̂ reliability threshold.
    pub k_threshold: Option<f64>,
    /// Use the sample-size dependent threshold when `k_threshold` is unset.
    pub sample_size_threshold: bool,
    /// Tails shorter than this are not smoothed (k̂ reported as `+inf`).
    pub min_tail_length: usize,
}

impl Default for PsisConfig {
    fn default() -> Self {
        Self { k_threshold: None, sample_size_threshold: false, min_tail_length: 5 }
    }
}

impl PsisConfig {
    /// Reliability threshold for `n_draws` draws.
    pub fn threshold(&self, n_draws: usize) -> f64 {
        match self.k_threshold {
            Some(t) => t,
            None if self.sample_size_threshold => khat_threshold(n_draws),
            None => DEFAULT_K_THRESHOLD,
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.k_threshold {
            if !t.is_finite() {
                return Err(Error::Validation(format!("k_threshold must be finite, got {}", t)));
            }
        }
        if self.min_tail_length < 2 {
            return Err(Error::Validation(format!(
                "min_tail_length must be >= 2, got {}",
                self.min_tail_length
            )));
        }
        Ok(())
    }
}

/// Sample-size dependent k̂ threshold `min(1 - 1/log10(S), 0.7)`.
///
/// Non-positive for `S <= 10`, so with that few draws every observation is
/// flagged.
pub fn khat_threshold(n_draws: usize) -> f64 {
    if n_draws <= 10 {
        return 0.0;
    }
    (1.0 - 1.0 / (n_draws as f64).log10()).min(DEFAULT_K_THRESHOLD)
}

/// Conventional k̂ bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KhatCategory {
    /// `k̂ <= 0.5`
    Good,
    /// `0.5 < k̂ <= 0.7`
    Ok,
    /// `0.7 < k̂ <= 1`
    Bad,
    /// `k̂ > 1` (or not finite)
    VeryBad,
}

impl KhatCategory {
    /// Band of a k̂ value.
    pub fn from_khat(k: f64) -> Self {
        if k <= 0.5 {
            KhatCategory::Good
        } else if k <= 0.7 {
            KhatCategory::Ok
        } else if k <= 1.0 {
            KhatCategory::Bad
        } else {
            KhatCategory::VeryBad
        }
    }
}

impl fmt::Display for KhatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KhatCategory::Good => write!(f, "good"),
            KhatCategory::Ok => write!(f, "ok"),
            KhatCategory::Bad => write!(f, "bad"),
            KhatCategory::VeryBad => write!(f, "very bad"),
        }
    }
}

/// Tail length `M = min(ceil(0.2 S), ceil(3 sqrt(S / r_eff)))`.
pub fn tail_length(n_draws: usize, r_eff: f64) -> usize {
    let s = n_draws as f64;
    let by_fraction = (0.2 * s).ceil();
    let by_ess = (3.0 * (s / r_eff).sqrt()).ceil();
    by_fraction.min(by_ess) as usize
}

/// Quantile of the generalized Pareto distribution with location 0.
pub fn gpd_quantile(p: f64, k: f64, sigma: f64) -> f64 {
    if k.abs() < 1e-12 {
        -sigma * (-p).ln_1p()
    } else {
        sigma * (-k * (-p).ln_1p()).exp_m1() / k
    }
}

fn profile_log_lik(theta: f64, x: &[f64]) -> f64 {
    let a = -theta;
    let k = x.iter().map(|&xi| (a * xi).ln_1p()).sum::<f64>() / x.len() as f64;
    (a / k).ln() - k - 1.0
}

/// Generalized Pareto fit `(k, σ)` to ascending non-negative exceedances.
///
/// Zhang & Stephens (2009) profile-likelihood grid of `30 + floor(sqrt(n))`
/// points with prior 3, then `k` is shrunk toward 0.5 as if 10 extra
/// observations at 0.5 had been seen.
pub fn gpd_fit(x: &[f64]) -> (f64, f64) {
    const PRIOR: f64 = 3.0;
    const MIN_GRID_POINTS: usize = 30;

    let n = x.len();
    if n == 0 {
        return (f64::INFINITY, f64::NAN);
    }
    let n_f = n as f64;
    let grid = MIN_GRID_POINTS + n_f.sqrt().floor() as usize;
    let x_max = x[n - 1];
    let quartile = ((n_f / 4.0 + 0.5).floor() as usize).max(1) - 1;
    let xstar = if x[quartile] > 0.0 {
        x[quartile]
    } else {
        x.iter().copied().find(|&v| v > 0.0).unwrap_or(x_max)
    };

    let theta: Vec<f64> = (1..=grid)
        .map(|j| 1.0 / x_max + (1.0 - (grid as f64 / (j as f64 - 0.5)).sqrt()) / PRIOR / xstar)
        .collect();
    let l_theta: Vec<f64> = theta
        .iter()
        .map(|&t| {
            let l = n_f * profile_log_lik(t, x);
            if l.is_nan() { f64::NEG_INFINITY } else { l }
        })
        .collect();
    let norm = log_sum_exp(&l_theta);
    let theta_hat: f64 = theta.iter().zip(&l_theta).map(|(t, l)| t * (l - norm).exp()).sum();

    let k = x.iter().map(|&xi| (-theta_hat * xi).ln_1p()).sum::<f64>() / n_f;
    let sigma = -k / theta_hat;
    let k = (k * n_f + 5.0) / (n_f + 10.0);
    if k.is_nan() { (f64::INFINITY, sigma) } else { (k, sigma) }
}

/// Smoothed weights of one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsisResult {
    /// Self-normalized log weights (their log-sum-exp is 0).
    pub log_weights: Vec<f64>,
    /// Generalized Pareto shape of the tail.
    pub pareto_k: f64,
    /// Number of draws in the tail.
    pub tail_length: usize,
}

/// Pareto-smooth one vector of log importance ratios.
pub fn psis_smooth(log_ratios: &[f64], r_eff: f64, config: &PsisConfig) -> Result<PsisResult> {
    let s = log_ratios.len();
    if s == 0 {
        return Err(Error::Validation("PSIS needs at least one draw".into()));
    }
    if let Some(i) = log_ratios.iter().position(|x| !x.is_finite()) {
        return Err(Error::Validation(format!(
            "log importance ratio {} is not finite ({})",
            i, log_ratios[i]
        )));
    }
    if !(r_eff.is_finite() && r_eff > 0.0) {
        return Err(Error::Validation(format!("r_eff must be finite and > 0, got {}", r_eff)));
    }

    let max = log_ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut lw: Vec<f64> = log_ratios.iter().map(|&x| x - max).collect();
    let m = tail_length(s, r_eff);
    let mut pareto_k = f64::INFINITY;

    if m >= config.min_tail_length && m < s {
        let mut order: Vec<usize> = (0..s).collect();
        order.sort_by(|&a, &b| lw[a].total_cmp(&lw[b]));
        let tail_ids = &order[s - m..];
        let cutoff = lw[order[s - m - 1]];
        let lo = lw[tail_ids[0]];
        let hi = lw[tail_ids[m - 1]];

        if hi - lo <= f64::EPSILON / 100.0 {
            // No spread: the raw weights are already exact.
            pareto_k = 0.0;
        } else {
            let exp_cutoff = cutoff.exp();
            let exceedances: Vec<f64> = tail_ids.iter().map(|&i| lw[i].exp() - exp_cutoff).collect();
            let (k, sigma) = gpd_fit(&exceedances);
            pareto_k = k;
            if k.is_finite() {
                for (r, &i) in tail_ids.iter().enumerate() {
                    let p = (r as f64 + 0.5) / m as f64;
                    lw[i] = (gpd_quantile(p, k, sigma) + exp_cutoff).ln();
                }
            }
        }
    }

    // Truncate at the largest raw ratio, then normalize.
    for w in &mut lw {
        if *w > 0.0 {
            *w = 0.0;
        }
    }
    let norm = log_sum_exp(&lw);
    for w in &mut lw {
        *w -= norm;
    }
    Ok(PsisResult { log_weights: lw, pareto_k, tail_length: m })
}

/// Relative efficiency of `exp(log_lik)` per observation, using the chain
/// structure of the matrix.
pub fn log_lik_relative_eff(log_lik: &DrawMatrix) -> Vec<f64> {
    (0..log_lik.n_obs())
        .into_par_iter()
        .map(|i| {
            let chains = log_lik.column_by_chain(i);
            let max = chains.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max);
            if !max.is_finite() {
                return 1.0;
            }
            let scaled: Vec<Vec<f64>> =
                chains.iter().map(|c| c.iter().map(|&l| (l - max).exp()).collect()).collect();
            let refs: Vec<&[f64]> = scaled.iter().map(|c| c.as_slice()).collect();
            relative_efficiency(&refs)
        })
        .collect()
}

/// PSIS leave-one-out weights for every observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsisWeights {
    /// Normalized log weights, draws × observations.
    pub log_weights: DrawMatrix,
    /// k̂ per observation.
    pub pareto_k: Vec<f64>,
    /// Tail length per observation.
    pub tail_lengths: Vec<usize>,
    /// Relative efficiency per observation.
    pub r_eff: Vec<f64>,
    /// Threshold above which an observation is unreliable.
    pub k_threshold: f64,
}

impl PsisWeights {
    /// Number of draws.
    pub fn n_draws(&self) -> usize {
        self.log_weights.n_draws()
    }

    /// Number of observations.
    pub fn n_obs(&self) -> usize {
        self.log_weights.n_obs()
    }

    /// Log weights of one observation across draws.
    pub fn column(&self, obs: usize) -> Vec<f64> {
        self.log_weights.column(obs)
    }

    /// Whether observation `obs` has k̂ at or below the threshold.
    pub fn is_reliable(&self, obs: usize) -> bool {
        self.pareto_k[obs] <= self.k_threshold
    }

    /// Observations with k̂ above the threshold.
    pub fn flagged(&self) -> Vec<usize> {
        (0..self.n_obs()).filter(|&i| !self.is_reliable(i)).collect()
    }

    /// k̂ band per observation.
    pub fn categories(&self) -> Vec<KhatCategory> {
        self.pareto_k.iter().map(|&k| KhatCategory::from_khat(k)).collect()
    }
}

/// Smooth the leave-one-out ratios `-log_lik` of every observation.
///
/// `r_eff` defaults to [`log_lik_relative_eff`]. Observations run in parallel.
pub fn psis(log_lik: &DrawMatrix, r_eff: Option<&[f64]>, config: &PsisConfig) -> Result<PsisWeights> {
    config.validate()?;
    let (s, n) = (log_lik.n_draws(), log_lik.n_obs());
    if s == 0 || n == 0 {
        return Err(Error::Validation(format!(
            "log-likelihood matrix is empty ({} draws x {} observations)",
            s, n
        )));
    }
    let r_eff = match r_eff {
        Some(r) if r.len() != n => {
            return Err(Error::Validation(format!(
                "r_eff has length {}, expected {}",
                r.len(),
                n
            )));
        }
        Some(r) => r.to_vec(),
        None => log_lik_relative_eff(log_lik),
    };

    let per_obs = (0..n)
        .into_par_iter()
        .map(|i| {
            let ratios: Vec<f64> = log_lik.column(i).iter().map(|l| -l).collect();
            psis_smooth(&ratios, r_eff[i], config)
                .map_err(|e| Error::Validation(format!("observation {}: {}", i, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let rows: Vec<Vec<f64>> =
        (0..s).map(|d| per_obs.iter().map(|r| r.log_weights[d]).collect()).collect();
    let log_weights = DrawMatrix::from_rows(&rows, log_lik.chain_ids())?;
    let out = PsisWeights {
        log_weights,
        pareto_k: per_obs.iter().map(|r| r.pareto_k).collect(),
        tail_lengths: per_obs.iter().map(|r| r.tail_length).collect(),
        r_eff,
        k_threshold: config.threshold(s),
    };

    let short = out.tail_lengths.iter().filter(|&&m| m < config.min_tail_length).count();
    if short > 0 {
        log::warn!(
            "{} of {} observations have fewer than {} tail draws; ratios were not smoothed",
            short,
            n,
            config.min_tail_length
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    fn gpd_sample(n: usize, k: f64, sigma: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x: Vec<f64> = (0..n).map(|_| gpd_quantile(rng.gen::<f64>(), k, sigma)).collect();
        x.sort_by(|a, b| a.total_cmp(b));
        x
    }

    #[test]
    fn test_tail_length_and_threshold() {
        assert_eq!(tail_length(1000, 1.0), 95);
        assert_eq!(tail_length(100, 1.0), 20);
        assert_eq!(tail_length(1000, 0.25), 190);
        assert_relative_eq!(khat_threshold(1000), 1.0 - 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(khat_threshold(100), 0.5, epsilon = 1e-12);
        assert_eq!(khat_threshold(1_000_000), 0.7);
        let cfg = PsisConfig { k_threshold: Some(0.6), ..Default::default() };
        assert_eq!(cfg.threshold(100), 0.6);
        assert_eq!(khat_threshold(5), 0.0);
    }

    #[test]
    fn test_default_threshold_is_fixed() {
        let cfg = PsisConfig::default();
        assert_eq!(cfg.threshold(100), 0.7);
        assert_eq!(cfg.threshold(5), 0.7);
        let adaptive = PsisConfig { sample_size_threshold: true, ..Default::default() };
        assert_relative_eq!(adaptive.threshold(100), 0.5, epsilon = 1e-12);
        assert_eq!(adaptive.threshold(1_000_000), 0.7);
        let both = PsisConfig { k_threshold: Some(0.9), sample_size_threshold: true, ..Default::default() };
        assert_eq!(both.threshold(100), 0.9);

        // k̂ = 0.65 with 400 draws: kept by default, flagged by the adaptive rule.
        let weights = PsisWeights {
            log_weights: DrawMatrix::from_single_chain(&vec![vec![-(400f64.ln())]; 400]).unwrap(),
            pareto_k: vec![0.65],
            tail_lengths: vec![80],
            r_eff: vec![1.0],
            k_threshold: cfg.threshold(400),
        };
        assert!(weights.flagged().is_empty());
        let strict = PsisWeights { k_threshold: adaptive.threshold(400), ..weights };
        assert_eq!(strict.flagged(), vec![0]);
    }

    #[test]
    fn test_gpd_quantile_closed_form() {
        assert_relative_eq!(gpd_quantile(0.5, 0.5, 2.0), 4.0 * (2f64.sqrt() - 1.0), epsilon = 1e-12);
        // k -> 0 is the exponential distribution.
        assert_relative_eq!(gpd_quantile(0.5, 0.0, 2.0), 2.0 * 2f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(gpd_quantile(0.5, 1e-9, 2.0), 2.0 * 2f64.ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_gpd_fit_recovers_shape() {
        for (k, sigma, seed) in [(0.5, 1.0, 1), (0.2, 3.0, 2), (0.9, 0.5, 3)] {
            let x = gpd_sample(5000, k, sigma, seed);
            let (k_hat, s_hat) = gpd_fit(&x);
            assert!((k_hat - k).abs() < 0.1, "k: {} vs {}", k_hat, k);
            assert!((s_hat / sigma - 1.0).abs() < 0.15, "sigma: {} vs {}", s_hat, sigma);
        }
    }

    #[test]
    fn test_constant_ratios_are_exact() {
        let r = psis_smooth(&[2.5; 200], 1.0, &PsisConfig::default()).unwrap();
        assert_eq!(r.pareto_k, 0.0);
        for w in &r.log_weights {
            assert_relative_eq!(*w, -(200f64).ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_short_tail_is_not_smoothed() {
        let ratios: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let r = psis_smooth(&ratios, 1.0, &PsisConfig::default()).unwrap();
        assert_eq!(r.tail_length, 2);
        assert!(r.pareto_k.is_infinite());
        let norm = log_sum_exp(&ratios);
        for (w, x) in r.log_weights.iter().zip(&ratios) {
            assert_relative_eq!(*w, x - norm, epsilon = 1e-12);
        }
        // Two draws still give finite positive weights.
        let r2 = psis_smooth(&[0.1, -0.4], 1.0, &PsisConfig::default()).unwrap();
        assert!(r2.log_weights.iter().all(|w| w.is_finite()));
    }

    #[test]
    fn test_light_and_heavy_tails() {
        let mut rng = StdRng::seed_from_u64(17);
        let normal = Normal::new(0.0, 0.3).unwrap();
        let light: Vec<f64> = (0..4000).map(|_| normal.sample(&mut rng)).collect();
        let r = psis_smooth(&light, 1.0, &PsisConfig::default()).unwrap();
        assert!(r.pareto_k < 0.5, "light tail k: {}", r.pareto_k);

        let heavy: Vec<f64> =
            (0..4000).map(|_| (1.0 + gpd_quantile(rng.gen::<f64>(), 1.5, 1.0)).ln()).collect();
        let r = psis_smooth(&heavy, 1.0, &PsisConfig::default()).unwrap();
        assert!(r.pareto_k > 0.7, "heavy tail k: {}", r.pareto_k);
        assert_ne!(KhatCategory::from_khat(r.pareto_k), KhatCategory::Good);
    }

    #[test]
    fn test_smoothing_preserves_order_and_normalizes() {
        let mut rng = StdRng::seed_from_u64(5);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let ratios: Vec<f64> = (0..1000).map(|_| normal.sample(&mut rng)).collect();
        let r = psis_smooth(&ratios, 1.0, &PsisConfig::default()).unwrap();
        assert!(r.pareto_k.is_finite());
        assert_relative_eq!(log_sum_exp(&r.log_weights), 0.0, epsilon = 1e-10);
        let mut order: Vec<usize> = (0..ratios.len()).collect();
        order.sort_by(|&a, &b| ratios[a].total_cmp(&ratios[b]));
        for pair in order.windows(2) {
            assert!(r.log_weights[pair[0]] <= r.log_weights[pair[1]] + 1e-12);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let cfg = PsisConfig::default();
        assert!(psis_smooth(&[], 1.0, &cfg).is_err());
        assert!(psis_smooth(&[0.0, f64::NAN], 1.0, &cfg).is_err());
        assert!(psis_smooth(&[0.0, 1.0], 0.0, &cfg).is_err());
        let bad = PsisConfig { min_tail_length: 1, ..Default::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(KhatCategory::from_khat(0.3), KhatCategory::Good);
        assert_eq!(KhatCategory::from_khat(0.5), KhatCategory::Good);
        assert_eq!(KhatCategory::from_khat(0.6), KhatCategory::Ok);
        assert_eq!(KhatCategory::from_khat(0.9), KhatCategory::Bad);
        assert_eq!(KhatCategory::from_khat(1.2), KhatCategory::VeryBad);
        assert_eq!(KhatCategory::from_khat(f64::INFINITY), KhatCategory::VeryBad);
        assert_eq!(KhatCategory::VeryBad.to_string(), "very bad");
    }

    #[test]
    fn test_matrix_weights() {
        let mut rng = StdRng::seed_from_u64(8);
        let normal = Normal::new(-3.0, 0.5).unwrap();
        let rows: Vec<Vec<f64>> =
            (0..400).map(|_| (0..3).map(|_| normal.sample(&mut rng)).collect()).collect();
        let chain_ids: Vec<usize> = (0..400).map(|s| s / 100).collect();
        let ll = DrawMatrix::from_rows(&rows, &chain_ids).unwrap();
        let w = psis(&ll, None, &PsisConfig::default()).unwrap();
        assert_eq!(w.n_draws(), 400);
        assert_eq!(w.n_obs(), 3);
        assert_eq!(w.log_weights.chain_ids(), ll.chain_ids());
        for i in 0..3 {
            assert!(w.pareto_k[i].is_finite());
            assert!(w.r_eff[i] > 0.0 && w.r_eff[i] <= 1.0);
            assert_relative_eq!(log_sum_exp(&w.column(i)), 0.0, epsilon = 1e-10);
        }
        assert!(psis(&ll, Some(&[1.0]), &PsisConfig::default()).is_err());
        assert!(psis(&DrawMatrix::new(2), None, &PsisConfig::default()).is_err());
    }
}
