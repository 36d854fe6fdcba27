//! Synthetic datasets with known truth, and draws from the prior.
//!
//! All randomness comes from the generator passed in; the same seed gives the
//! same dataset. Site effects are drawn exactly as the model assumes:
//! `ε_j = diag(σ_VB)·L_Ω·z_j` with `z_j ~ N(0, I)`.

use fg_core::{Error, Result};
use nalgebra::DMatrix;
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution, Gamma, LogNormal, Normal, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::config::ModelVariant;
use crate::data::{CmrData, GrowthData, MixtureData, SiteCovariates};
use crate::density::GrowthModel;
use crate::growth::{mean_length, recapture_mean_length};
use crate::params::{ModelParams, SiteGrowth};
use crate::random_effects::site_deviations;

/// True parameters and sample sizes for a synthetic dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of sites `J`.
    pub n_sites: usize,
    /// Number of mixture observations.
    pub n_mixture: usize,
    /// Number of CMR pairs.
    pub n_cmr: usize,
    /// Population length at age 0.
    pub l0: f64,
    /// Population asymptotic length.
    pub linf: f64,
    /// Population growth rate (1/year).
    pub k: f64,
    /// Site-level sds on the log scale, `[L0, Linf, k]`.
    pub sigma_vb: [f64; 3],
    /// Correlation of the site effects, row-major 3×3 over `[L0, Linf, k]`.
    pub omega: [f64; 9],
    /// Mixture observation sd (log scale).
    pub sigma_mix: f64,
    /// CMR observation sd (log scale).
    pub sigma_cmr: f64,
    /// Class proportions shared by all sites (length `A`).
    pub theta: Vec<f64>,
    /// Per-site class proportions, overriding `theta` when set.
    pub site_theta: Option<Vec<Vec<f64>>>,
    /// Relative sampling weight of each site (uniform when unset).
    pub site_weights: Option<Vec<f64>>,
    /// Log-mean of the capture-length distribution (lognormal).
    pub capture_log_mean: f64,
    /// Log-sd of the capture-length distribution.
    pub capture_log_sd: f64,
    /// Shortest interval between capture and recapture (days).
    pub min_days: u32,
    /// Longest interval between capture and recapture (days).
    pub max_days: u32,
    /// Covariate slopes on `log Linf`; one standard-normal covariate is drawn
    /// per slope and site.
    pub beta_linf: Vec<f64>,
    /// Covariate slopes on `log k` (same length as `beta_linf`).
    pub beta_k: Vec<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_sites: 10,
            n_mixture: 500,
            n_cmr: 200,
            l0: 25.0,
            linf: 250.0,
            k: 0.4,
            sigma_vb: [0.1, 0.1, 0.15],
            omega: [1.0, 0.2, -0.1, 0.2, 1.0, -0.5, -0.1, -0.5, 1.0],
            sigma_mix: 0.1,
            sigma_cmr: 0.05,
            theta: vec![0.35, 0.3, 0.2, 0.15],
            site_theta: None,
            site_weights: None,
            capture_log_mean: 100f64.ln(),
            capture_log_sd: 0.3,
            min_days: 30,
            max_days: 730,
            beta_linf: Vec::new(),
            beta_k: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Number of age classes `A`.
    pub fn n_age_classes(&self) -> usize {
        match &self.site_theta {
            Some(rows) => rows.first().map_or(0, |r| r.len()),
            None => self.theta.len(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self, variant: ModelVariant) -> Result<()> {
        let bad = |msg: String| Err(Error::Validation(msg));
        if self.n_sites == 0 {
            return bad("simulation needs at least one site".into());
        }
        if variant.has_mixture() && self.n_mixture == 0 {
            return bad("simulation needs at least one mixture observation".into());
        }
        if variant.has_cmr() && self.n_cmr == 0 {
            return bad("simulation needs at least one CMR observation".into());
        }
        let positive = [
            ("l0", self.l0),
            ("linf", self.linf),
            ("k", self.k),
            ("sigma_mix", self.sigma_mix),
            ("sigma_cmr", self.sigma_cmr),
            ("capture_log_sd", self.capture_log_sd),
            ("sigma_vb[L0]", self.sigma_vb[0]),
            ("sigma_vb[Linf]", self.sigma_vb[1]),
            ("sigma_vb[k]", self.sigma_vb[2]),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return bad(format!("{} must be finite and > 0, got {}", name, v));
            }
        }
        if self.min_days > self.max_days {
            return bad(format!(
                "min_days ({}) exceeds max_days ({})",
                self.min_days, self.max_days
            ));
        }
        if self.beta_linf.len() != self.beta_k.len() {
            return bad("beta_linf and beta_k must have the same length".into());
        }
        if variant.has_mixture() {
            let tol = 1e-8;
            match &self.site_theta {
                Some(rows) => {
                    if rows.len() != self.n_sites {
                        return bad(format!(
                            "site_theta has {} rows, expected {}",
                            rows.len(),
                            self.n_sites
                        ));
                    }
                    let a = self.n_age_classes();
                    if a < 2
                        || rows.iter().any(|r| {
                            r.len() != a || !fg_prob::dirichlet::is_simplex(r, tol)
                        })
                    {
                        return bad("every site_theta row must be a simplex of equal length >= 2".into());
                    }
                }
                None => {
                    if self.theta.len() < 2 || !fg_prob::dirichlet::is_simplex(&self.theta, tol) {
                        return bad("theta must be a simplex with at least 2 classes".into());
                    }
                }
            }
        }
        if let Some(w) = &self.site_weights {
            if w.len() != self.n_sites || w.iter().any(|&x| !x.is_finite() || x < 0.0) {
                return bad("site_weights must have one finite, non-negative entry per site".into());
            }
        }
        Ok(())
    }

    /// Cholesky factor of `omega` restricted to `components` (row-major).
    fn omega_cholesky(&self, components: &[usize]) -> Result<Vec<f64>> {
        let k = components.len();
        for r in 0..3 {
            if (self.omega[r * 3 + r] - 1.0).abs() > 1e-12 {
                return Err(Error::Validation("omega must have a unit diagonal".into()));
            }
            for c in 0..r {
                if (self.omega[r * 3 + c] - self.omega[c * 3 + r]).abs() > 1e-12 {
                    return Err(Error::Validation("omega must be symmetric".into()));
                }
            }
        }
        let sub = DMatrix::from_fn(k, k, |r, c| self.omega[components[r] * 3 + components[c]]);
        let chol = sub
            .cholesky()
            .ok_or_else(|| Error::Validation("omega is not positive definite".into()))?;
        let l = chol.l();
        let mut out = vec![0.0; k * k];
        for r in 0..k {
            for c in 0..=r {
                out[r * k + c] = l[(r, c)];
            }
        }
        Ok(out)
    }
}

/// The latent truth behind a simulated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationTruth {
    /// Model variant the data were simulated for.
    pub variant: ModelVariant,
    /// True parameters in the model's parameterisation.
    pub params: ModelParams,
    /// True age class of each mixture observation.
    pub comp: Vec<usize>,
}

/// A simulated dataset together with its truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedData {
    /// The observations.
    pub data: GrowthData,
    /// The parameters and latent classes that generated them.
    pub truth: SimulationTruth,
}

fn lognormal(mu: f64, sigma: f64) -> Result<LogNormal<f64>> {
    LogNormal::new(mu, sigma).map_err(|e| Error::Validation(format!("lognormal: {}", e)))
}

fn draw_site<R: Rng + ?Sized>(n_sites: usize, picker: Option<&WeightedIndex<f64>>, rng: &mut R) -> usize {
    match picker {
        Some(w) => w.sample(rng),
        None => rng.gen_range(0..n_sites),
    }
}

/// Simulate a dataset for `variant` from `cfg`.
pub fn simulate<R: Rng + ?Sized>(
    cfg: &SimulationConfig,
    variant: ModelVariant,
    rng: &mut R,
) -> Result<SimulatedData> {
    cfg.validate(variant)?;
    let components: &[usize] = if variant.has_mixture() { &[0, 1, 2] } else { &[1, 2] };
    let k = components.len();
    let j_sites = cfg.n_sites;
    let (li, ki) = (k - 2, k - 1);

    let l_omega = cfg.omega_cholesky(components)?;
    let sigma_vb: Vec<f64> = components.iter().map(|&c| cfg.sigma_vb[c]).collect();
    let b0: Vec<f64> = components.iter().map(|&c| [cfg.l0, cfg.linf, cfg.k][c].ln()).collect();
    let z: Vec<f64> = (0..j_sites * k).map(|_| rng.sample(StandardNormal)).collect();
    let eps = site_deviations(&z, &l_omega, &sigma_vb, k);

    let n_cov = cfg.beta_linf.len();
    let covariates = if n_cov > 0 {
        let rows: Vec<Vec<f64>> = (0..j_sites)
            .map(|_| (0..n_cov).map(|_| rng.sample(StandardNormal)).collect())
            .collect();
        let names = (0..n_cov).map(|c| format!("x{}", c)).collect();
        Some(SiteCovariates::new(names, &rows)?)
    } else {
        None
    };

    let sites: Vec<SiteGrowth> = (0..j_sites)
        .map(|j| {
            let e = &eps[j * k..(j + 1) * k];
            let (mut log_linf, mut log_k) = (b0[li] + e[li], b0[ki] + e[ki]);
            if let Some(cov) = &covariates {
                for (c, &x) in cov.site(j).iter().enumerate() {
                    log_linf += x * cfg.beta_linf[c];
                    log_k += x * cfg.beta_k[c];
                }
            }
            SiteGrowth {
                l0: (k == 3).then(|| (b0[0] + e[0]).exp()),
                linf: log_linf.exp(),
                k: log_k.exp(),
            }
        })
        .collect();

    let theta: Vec<Vec<f64>> = if variant.has_mixture() {
        cfg.site_theta.clone().unwrap_or_else(|| vec![cfg.theta.clone(); j_sites])
    } else {
        Vec::new()
    };

    let site_picker = cfg
        .site_weights
        .as_ref()
        .map(|w| WeightedIndex::<f64>::new(w))
        .transpose()
        .map_err(|e| Error::Validation(format!("site_weights: {}", e)))?;

    let mut mixture = None;
    let mut comp = Vec::new();
    if variant.has_mixture() {
        let class_pickers = theta
            .iter()
            .map(|t| WeightedIndex::<f64>::new(t))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Validation(format!("theta: {}", e)))?;
        let mut lengths = Vec::with_capacity(cfg.n_mixture);
        let mut site_idx = Vec::with_capacity(cfg.n_mixture);
        for _ in 0..cfg.n_mixture {
            let j = draw_site(j_sites, site_picker.as_ref(), rng);
            let a = class_pickers[j].sample(rng);
            let s = &sites[j];
            let mu = mean_length(s.l0.unwrap_or(cfg.l0), s.linf, s.k, a as f64);
            lengths.push(lognormal(mu.ln(), cfg.sigma_mix)?.sample(rng));
            site_idx.push(j);
            comp.push(a);
        }
        mixture = Some(MixtureData::new(lengths, site_idx)?);
    }

    let mut cmr = None;
    if variant.has_cmr() {
        let capture = lognormal(cfg.capture_log_mean, cfg.capture_log_sd)?;
        let n = cfg.n_cmr;
        let (mut site_idx, mut cap, mut rec, mut days) =
            (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
        for _ in 0..n {
            let j = draw_site(j_sites, site_picker.as_ref(), rng);
            let l_cap: f64 = capture.sample(rng);
            let d = rng.gen_range(cfg.min_days..=cfg.max_days) as f64;
            let mu = recapture_mean_length(l_cap, sites[j].linf, sites[j].k, d);
            site_idx.push(j);
            cap.push(l_cap);
            rec.push(lognormal(mu.ln(), cfg.sigma_cmr)?.sample(rng));
            days.push(d);
        }
        cmr = Some(CmrData::new(site_idx, cap, rec, days)?);
    }

    let mut data = GrowthData::new(j_sites, mixture, cmr)?;
    if let Some(cov) = covariates {
        data = data.with_covariates(cov)?;
    }
    log::debug!(
        "simulated {:?}: sites={} mixture={} cmr={}",
        variant,
        j_sites,
        data.mixture().map_or(0, |m| m.len()),
        data.cmr().map_or(0, |c| c.len())
    );

    let params = ModelParams {
        b0,
        beta_linf: cfg.beta_linf.clone(),
        beta_k: cfg.beta_k.clone(),
        sigma_vb,
        l_omega,
        z,
        sigma_mix: variant.has_mixture().then_some(cfg.sigma_mix),
        sigma_cmr: variant.has_cmr().then_some(cfg.sigma_cmr),
        theta,
        eps,
        sites,
    };
    Ok(SimulatedData { data, truth: SimulationTruth { variant, params, comp } })
}

/// Mixture-only dataset.
pub fn simulate_mixture<R: Rng + ?Sized>(cfg: &SimulationConfig, rng: &mut R) -> Result<SimulatedData> {
    simulate(cfg, ModelVariant::Mixture, rng)
}

/// CMR-only dataset (site effects on `Linf`, `k` only).
pub fn simulate_cmr<R: Rng + ?Sized>(cfg: &SimulationConfig, rng: &mut R) -> Result<SimulatedData> {
    simulate(cfg, ModelVariant::Cmr, rng)
}

/// Mixture and CMR data sharing the same sites and site effects.
pub fn simulate_integrated<R: Rng + ?Sized>(
    cfg: &SimulationConfig,
    rng: &mut R,
) -> Result<SimulatedData> {
    simulate(cfg, ModelVariant::Integrated, rng)
}

/// [`simulate`] with a fresh `StdRng` seeded from `seed`.
pub fn simulate_seeded(cfg: &SimulationConfig, variant: ModelVariant, seed: u64) -> Result<SimulatedData> {
    simulate(cfg, variant, &mut StdRng::seed_from_u64(seed))
}

/// Draw one parameter set from the model's prior.
///
/// `L_Ω` is built from canonical partial correlations `2·Beta(α, α) - 1`
/// with `α = η + (K - 2 - c)/2` for column `c`, which is exactly
/// `LKJCorrCholesky(η)`. Requires `η > 0`.
pub fn draw_prior<R: Rng + ?Sized>(model: &GrowthModel, rng: &mut R) -> Result<ModelParams> {
    let cfg = model.config();
    let lay = model.layout();
    let variant = lay.variant();
    let k = lay.k();
    let pri = &cfg.priors;
    if cfg.lkj_eta <= 0.0 {
        return Err(Error::Validation(format!(
            "cannot draw from an improper LKJ prior (eta = {})",
            cfg.lkj_eta
        )));
    }
    let normal = |mean: f64, sd: f64| {
        Normal::new(mean, sd).map_err(|e| Error::Validation(format!("normal prior: {}", e)))
    };
    let half_normal = |scale: f64, rng: &mut R| -> f64 {
        let x: f64 = rng.sample(StandardNormal);
        (x * scale).abs()
    };

    let mut b0 = Vec::with_capacity(k);
    for p in pri.intercepts(variant) {
        b0.push(normal(p.mean, p.sd)?.sample(rng));
    }
    let beta_dist = normal(0.0, pri.beta_sd)?;
    let beta_linf = (0..lay.n_covariates()).map(|_| beta_dist.sample(rng)).collect();
    let beta_k = (0..lay.n_covariates()).map(|_| beta_dist.sample(rng)).collect();
    let sigma_vb =
        pri.sigma_vb_scales(variant).into_iter().map(|s| half_normal(s, rng)).collect();

    // Canonical partial correlations, in the row-wise order the transform reads.
    let mut y = Vec::with_capacity(lay.l_omega_raw().len());
    for r in 1..k {
        for c in 0..r {
            let alpha = cfg.lkj_eta + (k - 2 - c) as f64 / 2.0;
            let b = Beta::new(alpha, alpha)
                .map_err(|e| Error::Validation(format!("LKJ beta({}): {}", alpha, e)))?;
            let cpc = (2.0 * b.sample(rng) - 1.0).clamp(-1.0 + 1e-12, 1.0 - 1e-12);
            y.push(cpc.atanh());
        }
    }
    let (l_omega, _) = fg_prob::transforms::cholesky_corr_constrain(&y, k);

    let z = (0..lay.z().len()).map(|_| rng.sample(StandardNormal)).collect();
    let sigma_mix = lay.log_sigma_mix().map(|_| half_normal(pri.sigma_mix_scale, rng));
    let sigma_cmr = lay.log_sigma_cmr().map(|_| half_normal(pri.sigma_cmr_scale, rng));

    let a = lay.n_classes();
    let mut theta = Vec::with_capacity(lay.n_sites());
    if a > 0 {
        let gammas = cfg
            .dirichlet_alpha
            .iter()
            .map(|&al| {
                Gamma::new(al, 1.0).map_err(|e| Error::Validation(format!("gamma({}): {}", al, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        for _ in 0..lay.n_sites() {
            let g: Vec<f64> =
                gammas.iter().map(|d| d.sample(rng).max(f64::MIN_POSITIVE)).collect();
            let total: f64 = g.iter().sum();
            theta.push(g.into_iter().map(|x| x / total).collect());
        }
    }

    model.complete(ModelParams {
        b0,
        beta_linf,
        beta_k,
        sigma_vb,
        l_omega,
        z,
        sigma_mix,
        sigma_cmr,
        theta,
        eps: Vec::new(),
        sites: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use approx::assert_relative_eq;

    #[test]
    fn test_seed_reproducibility() {
        let cfg = SimulationConfig::default();
        let a = simulate_seeded(&cfg, ModelVariant::Integrated, 42).unwrap();
        let b = simulate_seeded(&cfg, ModelVariant::Integrated, 42).unwrap();
        let c = simulate_seeded(&cfg, ModelVariant::Integrated, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.data, c.data);
    }

    #[test]
    fn test_shapes_per_variant() {
        let cfg = SimulationConfig { n_sites: 5, n_mixture: 50, n_cmr: 20, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(1);

        let mix = simulate_mixture(&cfg, &mut rng).unwrap();
        assert_eq!(mix.data.mixture().unwrap().len(), 50);
        assert!(mix.data.cmr().is_none());
        assert_eq!(mix.truth.comp.len(), 50);
        assert_eq!(mix.truth.params.l_omega.len(), 9);
        assert_eq!(mix.truth.params.theta.len(), 5);

        let cmr = simulate_cmr(&cfg, &mut rng).unwrap();
        assert_eq!(cmr.data.cmr().unwrap().len(), 20);
        assert_eq!(cmr.truth.params.l_omega.len(), 4);
        assert_eq!(cmr.truth.params.sites[0].l0, None);
        assert!(cmr.truth.params.theta.is_empty());
        for &d in cmr.data.cmr().unwrap().days() {
            assert!((30.0..=730.0).contains(&d));
        }
    }

    #[test]
    fn test_cmr_correlation_is_the_linf_k_block() {
        let cfg = SimulationConfig::default();
        let l = cfg.omega_cholesky(&[1, 2]).unwrap();
        assert_relative_eq!(l[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(l[2], cfg.omega[5], epsilon = 1e-12);
    }

    #[test]
    fn test_configuration_errors() {
        let mut rng = StdRng::seed_from_u64(0);
        let zero_sites = SimulationConfig { n_sites: 0, ..Default::default() };
        assert!(simulate_mixture(&zero_sites, &mut rng).is_err());
        let zero_obs = SimulationConfig { n_mixture: 0, ..Default::default() };
        assert!(simulate_mixture(&zero_obs, &mut rng).is_err());
        assert!(simulate_cmr(&zero_obs, &mut rng).is_ok());
        let bad_theta = SimulationConfig { theta: vec![0.5, 0.6], ..Default::default() };
        assert!(simulate_mixture(&bad_theta, &mut rng).is_err());
        let mut not_pd = SimulationConfig::default();
        not_pd.omega = [1.0, 0.99, -0.99, 0.99, 1.0, 0.99, -0.99, 0.99, 1.0];
        assert!(simulate_mixture(&not_pd, &mut rng).is_err());
        let days = SimulationConfig { min_days: 10, max_days: 5, ..Default::default() };
        assert!(simulate_cmr(&days, &mut rng).is_err());
    }

    #[test]
    fn test_mixture_lengths_track_class_means() {
        let cfg = SimulationConfig {
            n_sites: 1,
            n_mixture: 4000,
            sigma_vb: [1e-6, 1e-6, 1e-6],
            sigma_mix: 0.05,
            ..Default::default()
        };
        let sim = simulate_mixture(&cfg, &mut StdRng::seed_from_u64(9)).unwrap();
        let m = sim.data.mixture().unwrap();
        for cls in 0..4 {
            let logs: Vec<f64> = m
                .lengths()
                .iter()
                .zip(&sim.truth.comp)
                .filter(|&(_, &c)| c == cls)
                .map(|(y, _)| y.ln())
                .collect();
            let mean = logs.iter().sum::<f64>() / logs.len() as f64;
            let mu = mean_length(cfg.l0, cfg.linf, cfg.k, cls as f64);
            assert!((mean - mu.ln()).abs() < 0.01, "class {cls}: {mean} vs {}", mu.ln());
        }
    }

    #[test]
    fn test_covariate_effects_enter_site_parameters() {
        let cfg = SimulationConfig {
            beta_linf: vec![0.2],
            beta_k: vec![-0.1],
            ..Default::default()
        };
        let sim = simulate_seeded(&cfg, ModelVariant::Integrated, 3).unwrap();
        let cov = sim.data.covariates().unwrap();
        let p = &sim.truth.params;
        for j in 0..cfg.n_sites {
            let want = (p.b0[1] + p.eps[j * 3 + 1] + 0.2 * cov.site(j)[0]).exp();
            assert_relative_eq!(p.sites[j].linf, want, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_truth_is_consistent_with_model() {
        let cfg = SimulationConfig { n_sites: 4, n_mixture: 100, n_cmr: 40, ..Default::default() };
        for variant in [ModelVariant::Mixture, ModelVariant::Cmr, ModelVariant::Integrated] {
            let sim = simulate_seeded(&cfg, variant, 11).unwrap();
            let model =
                GrowthModel::new(sim.data.clone(), ModelConfig::new(variant, 4)).unwrap();
            let lp = model.log_density_params(&sim.truth.params).unwrap();
            assert!(lp.is_finite());
            let recomputed = model.complete(sim.truth.params.clone()).unwrap();
            for (a, b) in recomputed.sites.iter().zip(&sim.truth.params.sites) {
                assert_relative_eq!(a.linf, b.linf, max_relative = 1e-12);
                assert_relative_eq!(a.k, b.k, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_draw_prior_is_in_support() {
        let sim = simulate_seeded(&SimulationConfig::default(), ModelVariant::Integrated, 5).unwrap();
        let model = GrowthModel::new(sim.data, ModelConfig::new(ModelVariant::Integrated, 4)).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..20 {
            let p = draw_prior(&model, &mut rng).unwrap();
            assert!(model.log_prior_params(&p).unwrap().is_finite());
            let u = model.pack(&p).unwrap();
            assert!(model.log_density(&u).unwrap().is_finite());
        }
    }

    #[test]
    fn test_draw_prior_lkj_mean_correlation_is_zero() {
        // Off-diagonal correlations under LKJ(η) have mean 0 and
        // variance 1 / (2η + K - 1), i.e. 1/6 for K = 3, η = 2.
        let sim = simulate_seeded(&SimulationConfig::default(), ModelVariant::Mixture, 5).unwrap();
        let mut cfg = ModelConfig::new(ModelVariant::Mixture, 4);
        cfg.lkj_eta = 2.0;
        let model = GrowthModel::new(sim.data, cfg).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let n = 4000;
        let (mut s, mut ss) = (0.0, 0.0);
        for _ in 0..n {
            let omega = draw_prior(&model, &mut rng).unwrap().omega();
            let r = omega[2 * 3 + 1];
            s += r;
            ss += r * r;
        }
        let mean = s / n as f64;
        let var = ss / n as f64 - mean * mean;
        assert!(mean.abs() < 0.03, "mean {mean}");
        assert!((var - 1.0 / 6.0).abs() < 0.02, "var {var}");
    }
}
