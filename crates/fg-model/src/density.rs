//! Joint log density of the hierarchical growth model.
//!
//! The unconstrained vector (see [`ParameterLayout`]) is mapped to natural
//! scale with log-Jacobians, then priors and likelihoods are accumulated:
//!
//! - `b0 ~ Normal`, `beta ~ Normal(0, beta_sd)`, `σ_VB, σ_mix, σ_cmr ~ HalfNormal`,
//!   `z ~ Normal(0, 1)` (non-centred), `L_Ω ~ LKJCholesky(η)`, `θ_j ~ Dirichlet(α)`;
//! - mixture: `log Σ_a θ_j[a]·LogNormal(y_i | log μ_{j,a}, σ_mix)` with the
//!   latent class marginalised by a stable log-sum-exp;
//! - CMR: `LogNormal(y_i | log μ_i, σ_cmr)` with the capture length as the
//!   starting point of the growth curve.
//!
//! All of it is generic over [`Scalar`], so the same code gives values (`f64`)
//! and forward-mode derivatives ([`Dual`]). Per-observation terms are reduced
//! with rayon.

use fg_ad::{Dual, Scalar};
use fg_core::{Error, LogDensityModel, PreparedModelRef, Result};
use fg_prob::distributions::{half_normal_kernel, normal_kernel, std_normal_kernel};
use fg_prob::math::log_sum_exp_s;
use fg_prob::transforms::{
    cholesky_corr_constrain, cholesky_corr_unconstrain, positive_constrain, simplex_constrain,
    simplex_unconstrain,
};
use fg_prob::{dirichlet, lkj, lognormal};
use rayon::prelude::*;

use crate::config::{ModelConfig, ModelVariant, NormalPrior};
use crate::data::GrowthData;
use crate::growth::{mean_length_s, recapture_mean_length_s};
use crate::layout::ParameterLayout;
use crate::params::{ModelParams, SiteGrowth};
use crate::random_effects::site_deviations;

/// Tolerance for simplex sums and unit-norm Cholesky rows on natural-scale input.
pub const STRUCTURE_TOL: f64 = 1e-8;

/// Natural-scale parameters in the evaluation scalar type.
#[derive(Debug, Clone)]
pub(crate) struct Natural<S> {
    pub(crate) b0: Vec<S>,
    pub(crate) beta_linf: Vec<S>,
    pub(crate) beta_k: Vec<S>,
    pub(crate) sigma_vb: Vec<S>,
    pub(crate) l_omega: Vec<S>,
    pub(crate) z: Vec<S>,
    pub(crate) sigma_mix: Option<S>,
    pub(crate) sigma_cmr: Option<S>,
    /// `J × A`, site-major.
    pub(crate) theta: Vec<S>,
}

/// Per-site quantities shared by every observation of that site.
#[derive(Debug, Clone)]
pub(crate) struct SiteTables<S> {
    pub(crate) eps: Vec<S>,
    /// Empty for the CMR variant.
    pub(crate) l0: Vec<S>,
    pub(crate) linf: Vec<S>,
    pub(crate) k: Vec<S>,
    /// `J × A`.
    pub(crate) log_theta: Vec<S>,
    /// `J × A`: log mean length of class `a` at site `j`.
    pub(crate) log_mu: Vec<S>,
}

/// Hierarchical VBGF model over a validated dataset.
#[derive(Debug, Clone)]
pub struct GrowthModel {
    data: GrowthData,
    config: ModelConfig,
    layout: ParameterLayout,
    intercept_priors: Vec<NormalPrior>,
    sigma_vb_scales: Vec<f64>,
}

impl GrowthModel {
    /// Build a model, validating the configuration against the data.
    ///
    /// The variant's sub-datasets must be present; tables the variant does
    /// not use are ignored with a warning.
    pub fn new(data: GrowthData, config: ModelConfig) -> Result<Self> {
        config.validate()?;
        let variant = config.variant;
        if variant.has_mixture() && data.mixture().is_none() {
            return Err(Error::Validation(format!(
                "{:?} variant requires mixture observations",
                variant
            )));
        }
        if variant.has_cmr() && data.cmr().is_none() {
            return Err(Error::Validation(format!(
                "{:?} variant requires CMR observations",
                variant
            )));
        }
        if !variant.has_mixture() && data.mixture().is_some() {
            log::warn!("mixture observations are ignored by the {:?} variant", variant);
        }
        if !variant.has_cmr() && data.cmr().is_some() {
            log::warn!("CMR observations are ignored by the {:?} variant", variant);
        }
        let layout = ParameterLayout::new(
            variant,
            data.n_sites(),
            data.n_covariates(),
            config.n_age_classes,
        );
        log::debug!(
            "growth model: variant={:?} sites={} covariates={} classes={} dim={}",
            variant,
            layout.n_sites(),
            layout.n_covariates(),
            layout.n_classes(),
            layout.dim()
        );
        let intercept_priors = config.priors.intercepts(variant);
        let sigma_vb_scales = config.priors.sigma_vb_scales(variant);
        Ok(Self { data, config, layout, intercept_priors, sigma_vb_scales })
    }

    /// The dataset.
    pub fn data(&self) -> &GrowthData {
        &self.data
    }

    /// The configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The parameter layout.
    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    /// Model variant.
    pub fn variant(&self) -> ModelVariant {
        self.config.variant
    }

    /// Number of mixture observations entering the likelihood.
    pub fn n_mixture(&self) -> usize {
        if self.variant().has_mixture() { self.data.mixture().map_or(0, |m| m.len()) } else { 0 }
    }

    /// Number of CMR observations entering the likelihood.
    pub fn n_cmr(&self) -> usize {
        if self.variant().has_cmr() { self.data.cmr().map_or(0, |c| c.len()) } else { 0 }
    }

    fn check_len(&self, params: &[f64]) -> Result<()> {
        if params.len() != self.layout.dim() {
            return Err(Error::Validation(format!(
                "expected {} parameters, got {}",
                self.layout.dim(),
                params.len()
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Transforms
    // ---------------------------------------------------------------------

    /// Unconstrained vector to natural scale, plus the log-Jacobian.
    pub(crate) fn constrain<S: Scalar>(&self, u: &[S]) -> (Natural<S>, S) {
        let lay = &self.layout;
        let k = lay.k();
        let mut log_jac = S::zero();

        let mut sigma_vb = Vec::with_capacity(k);
        for &v in &u[lay.log_sigma_vb()] {
            let (s, lj) = positive_constrain(v);
            sigma_vb.push(s);
            log_jac = log_jac + lj;
        }
        let (l_omega, lj) = cholesky_corr_constrain(&u[lay.l_omega_raw()], k);
        log_jac = log_jac + lj;

        let mut scale_at = |idx: Option<usize>| {
            idx.map(|i| {
                let (s, lj) = positive_constrain(u[i]);
                log_jac = log_jac + lj;
                s
            })
        };
        let sigma_mix = scale_at(lay.log_sigma_mix());
        let sigma_cmr = scale_at(lay.log_sigma_cmr());

        let a = lay.n_classes();
        let mut theta = Vec::with_capacity(lay.n_sites() * a);
        if a > 0 {
            for raw in u[lay.theta_raw()].chunks_exact(a - 1) {
                let (t, lj) = simplex_constrain(raw);
                theta.extend(t);
                log_jac = log_jac + lj;
            }
        }

        let nat = Natural {
            b0: u[lay.b0()].to_vec(),
            beta_linf: u[lay.beta_linf()].to_vec(),
            beta_k: u[lay.beta_k()].to_vec(),
            sigma_vb,
            l_omega,
            z: u[lay.z()].to_vec(),
            sigma_mix,
            sigma_cmr,
            theta,
        };
        (nat, log_jac)
    }

    /// Shape-check a natural-scale parameter set and convert it.
    ///
    /// `Ok(None)` means the shapes are right but a value is outside the
    /// support (the density is `-inf` there).
    fn natural_from_params(&self, p: &ModelParams) -> Result<Option<Natural<f64>>> {
        let lay = &self.layout;
        let k = lay.k();
        let (j, c, a) = (lay.n_sites(), lay.n_covariates(), lay.n_classes());
        let shape_err = |what: &str, got: usize, want: usize| {
            Err(Error::Validation(format!("{} has length {}, expected {}", what, got, want)))
        };
        if p.b0.len() != k {
            return shape_err("b0", p.b0.len(), k);
        }
        if p.beta_linf.len() != c {
            return shape_err("beta_linf", p.beta_linf.len(), c);
        }
        if p.beta_k.len() != c {
            return shape_err("beta_k", p.beta_k.len(), c);
        }
        if p.sigma_vb.len() != k {
            return shape_err("sigma_vb", p.sigma_vb.len(), k);
        }
        if p.l_omega.len() != k * k {
            return shape_err("l_omega", p.l_omega.len(), k * k);
        }
        if p.z.len() != j * k {
            return shape_err("z", p.z.len(), j * k);
        }
        if p.sigma_mix.is_some() != lay.log_sigma_mix().is_some() {
            return Err(Error::Validation(format!(
                "sigma_mix must be {} for the {:?} variant",
                if lay.log_sigma_mix().is_some() { "set" } else { "absent" },
                lay.variant()
            )));
        }
        if p.sigma_cmr.is_some() != lay.log_sigma_cmr().is_some() {
            return Err(Error::Validation(format!(
                "sigma_cmr must be {} for the {:?} variant",
                if lay.log_sigma_cmr().is_some() { "set" } else { "absent" },
                lay.variant()
            )));
        }
        let want_rows = if a > 0 { j } else { 0 };
        if p.theta.len() != want_rows {
            return shape_err("theta", p.theta.len(), want_rows);
        }
        if let Some(row) = p.theta.iter().find(|row| row.len() != a) {
            return shape_err("theta row", row.len(), a);
        }

        let finite = |xs: &[f64]| xs.iter().all(|x| x.is_finite());
        let positive = |x: f64| x.is_finite() && x > 0.0;
        let ok = finite(&p.b0)
            && finite(&p.beta_linf)
            && finite(&p.beta_k)
            && finite(&p.z)
            && p.sigma_vb.iter().all(|&s| positive(s))
            && p.sigma_mix.map_or(true, positive)
            && p.sigma_cmr.map_or(true, positive)
            && lkj::is_cholesky_corr(&p.l_omega, k, STRUCTURE_TOL)
            && p.theta.iter().all(|t| dirichlet::is_simplex(t, STRUCTURE_TOL));
        if !ok {
            return Ok(None);
        }
        Ok(Some(Natural {
            b0: p.b0.clone(),
            beta_linf: p.beta_linf.clone(),
            beta_k: p.beta_k.clone(),
            sigma_vb: p.sigma_vb.clone(),
            l_omega: p.l_omega.clone(),
            z: p.z.clone(),
            sigma_mix: p.sigma_mix,
            sigma_cmr: p.sigma_cmr,
            theta: p.theta.concat(),
        }))
    }

    /// Like `natural_from_params`, but out-of-support values are an error.
    pub(crate) fn natural_in_support(&self, p: &ModelParams) -> Result<Natural<f64>> {
        self.natural_from_params(p)?
            .ok_or_else(|| Error::Validation("parameters are outside the support".into()))
    }

    /// Whether a transformed point is inside the support after rounding
    /// (overflowing scales, underflowing simplex entries, degenerate rows).
    fn is_admissible<S: Scalar>(&self, nat: &Natural<S>) -> bool {
        let k = self.layout.k();
        let finite = |xs: &[S]| xs.iter().all(|x| x.value().is_finite());
        let positive = |x: &S| x.value().is_finite() && x.value() > 0.0;
        finite(&nat.b0)
            && finite(&nat.beta_linf)
            && finite(&nat.beta_k)
            && finite(&nat.z)
            && finite(&nat.l_omega)
            && nat.sigma_vb.iter().all(positive)
            && nat.sigma_mix.as_ref().map_or(true, positive)
            && nat.sigma_cmr.as_ref().map_or(true, positive)
            && (0..k).all(|d| nat.l_omega[d * k + d].value() > 0.0)
            && nat.theta.iter().all(positive)
    }

    /// Whether the derived site growth parameters are usable: a finite
    /// intercept plus deviation can still overflow or underflow after `exp`.
    fn tables_admissible<S: Scalar>(&self, tables: &SiteTables<S>) -> bool {
        let positive = |x: &S| x.value().is_finite() && x.value() > 0.0;
        tables.l0.iter().all(positive)
            && tables.linf.iter().all(positive)
            && tables.k.iter().all(positive)
            && tables.log_mu.iter().all(|x| x.value().is_finite())
    }

    /// Site tables of a point that must lie inside the support.
    pub(crate) fn tables_in_support(&self, nat: &Natural<f64>) -> Result<SiteTables<f64>> {
        if !self.is_admissible(nat) {
            return Err(Error::Validation("parameters are outside the support".into()));
        }
        let tables = self.site_tables(nat);
        if !self.tables_admissible(&tables) {
            return Err(Error::Validation(
                "site growth parameters overflow or underflow".into(),
            ));
        }
        Ok(tables)
    }

    // ---------------------------------------------------------------------
    // Site-level quantities
    // ---------------------------------------------------------------------

    pub(crate) fn site_tables<S: Scalar>(&self, nat: &Natural<S>) -> SiteTables<S> {
        let lay = &self.layout;
        let (k, n_sites, a) = (lay.k(), lay.n_sites(), lay.n_classes());
        let (li, ki) = (lay.linf_index(), lay.k_index());
        let eps = site_deviations(&nat.z, &nat.l_omega, &nat.sigma_vb, k);
        let covariates = self.data.covariates();

        let mut l0 = Vec::with_capacity(if k == 3 { n_sites } else { 0 });
        let mut linf = Vec::with_capacity(n_sites);
        let mut kk = Vec::with_capacity(n_sites);
        for j in 0..n_sites {
            let e = &eps[j * k..(j + 1) * k];
            let mut log_linf = nat.b0[li] + e[li];
            let mut log_k = nat.b0[ki] + e[ki];
            if let Some(cov) = covariates {
                for (c, &x) in cov.site(j).iter().enumerate() {
                    log_linf = log_linf + S::from_f64(x) * nat.beta_linf[c];
                    log_k = log_k + S::from_f64(x) * nat.beta_k[c];
                }
            }
            if k == 3 {
                l0.push((nat.b0[0] + e[0]).exp());
            }
            linf.push(log_linf.exp());
            kk.push(log_k.exp());
        }

        let mut log_theta = Vec::with_capacity(n_sites * a);
        let mut log_mu = Vec::with_capacity(n_sites * a);
        if a > 0 {
            for j in 0..n_sites {
                for cls in 0..a {
                    log_theta.push(nat.theta[j * a + cls].ln());
                    log_mu.push(mean_length_s(l0[j], linf[j], kk[j], cls as f64).ln());
                }
            }
        }
        SiteTables { eps, l0, linf, k: kk, log_theta, log_mu }
    }

    // ---------------------------------------------------------------------
    // Priors and likelihoods
    // ---------------------------------------------------------------------

    fn log_prior<S: Scalar>(&self, nat: &Natural<S>) -> S {
        let pri = &self.config.priors;
        let k = self.layout.k();
        let mut lp = S::zero();
        for (&b, p) in nat.b0.iter().zip(&self.intercept_priors) {
            lp = lp + normal_kernel(b, p.mean, p.sd);
        }
        for &b in nat.beta_linf.iter().chain(&nat.beta_k) {
            lp = lp + normal_kernel(b, 0.0, pri.beta_sd);
        }
        for (&s, &scale) in nat.sigma_vb.iter().zip(&self.sigma_vb_scales) {
            lp = lp + half_normal_kernel(s, scale);
        }
        lp = lp + lkj::cholesky_log_kernel(&nat.l_omega, k, self.config.lkj_eta);
        lp = lp + std_normal_kernel(&nat.z);
        if let Some(s) = nat.sigma_mix {
            lp = lp + half_normal_kernel(s, pri.sigma_mix_scale);
        }
        if let Some(s) = nat.sigma_cmr {
            lp = lp + half_normal_kernel(s, pri.sigma_cmr_scale);
        }
        let a = self.layout.n_classes();
        if a > 0 {
            for theta_j in nat.theta.chunks_exact(a) {
                lp = lp + dirichlet::log_kernel(theta_j, &self.config.dirichlet_alpha);
            }
        }
        lp
    }

    /// Marginal log-likelihood of mixture observation `i`.
    pub(crate) fn mixture_obs_log_lik<S: Scalar>(
        &self,
        i: usize,
        tables: &SiteTables<S>,
        sigma_mix: S,
    ) -> S {
        let Some(mix) = self.data.mixture() else {
            return S::zero();
        };
        let a = self.layout.n_classes();
        let y = mix.lengths()[i];
        let j = mix.sites()[i];
        let terms: Vec<S> = (0..a)
            .map(|cls| {
                tables.log_theta[j * a + cls]
                    + lognormal::logpdf_s(y, tables.log_mu[j * a + cls], sigma_mix)
            })
            .collect();
        log_sum_exp_s(&terms)
    }

    /// Log-likelihood of CMR observation `i`.
    pub(crate) fn cmr_obs_log_lik<S: Scalar>(
        &self,
        i: usize,
        tables: &SiteTables<S>,
        sigma_cmr: S,
    ) -> S {
        let Some(cmr) = self.data.cmr() else {
            return S::zero();
        };
        let j = cmr.sites()[i];
        let mu = recapture_mean_length_s(
            cmr.capture_lengths()[i],
            tables.linf[j],
            tables.k[j],
            cmr.days()[i],
        );
        lognormal::logpdf_s(cmr.recapture_lengths()[i], mu.ln(), sigma_cmr)
    }

    fn log_likelihood<S: Scalar>(&self, nat: &Natural<S>, tables: &SiteTables<S>) -> S {
        if self.config.prior_only {
            return S::zero();
        }
        let mut ll = S::zero();
        if let Some(sm) = nat.sigma_mix {
            ll = ll
                + (0..self.n_mixture())
                    .into_par_iter()
                    .map(|i| self.mixture_obs_log_lik(i, tables, sm))
                    .sum::<S>();
        }
        if let Some(sc) = nat.sigma_cmr {
            ll = ll
                + (0..self.n_cmr())
                    .into_par_iter()
                    .map(|i| self.cmr_obs_log_lik(i, tables, sc))
                    .sum::<S>();
        }
        ll
    }

    fn log_prob_natural<S: Scalar>(&self, nat: &Natural<S>) -> S {
        let tables = self.site_tables(nat);
        if !self.tables_admissible(&tables) {
            return S::from_f64(f64::NEG_INFINITY);
        }
        self.log_prior(nat) + self.log_likelihood(nat, &tables)
    }

    fn log_prob_unconstrained<S: Scalar>(&self, u: &[S]) -> S {
        if u.iter().any(|v| !v.value().is_finite()) {
            return S::from_f64(f64::NEG_INFINITY);
        }
        let (nat, log_jac) = self.constrain(u);
        if !self.is_admissible(&nat) {
            return S::from_f64(f64::NEG_INFINITY);
        }
        self.log_prob_natural(&nat) + log_jac
    }

    fn finish(&self, lp: f64, what: &str) -> Result<f64> {
        if lp.is_nan() {
            log::warn!("{} evaluated to NaN", what);
            return Err(Error::Computation(format!("{} evaluated to NaN", what)));
        }
        Ok(lp)
    }

    // ---------------------------------------------------------------------
    // Public evaluation API
    // ---------------------------------------------------------------------

    /// Log density of the unconstrained vector (priors + likelihood + log-Jacobian).
    ///
    /// Returns `Ok(-inf)` for proposals outside the support, `Err(Computation)`
    /// if the arithmetic produced `NaN`.
    pub fn log_density(&self, params: &[f64]) -> Result<f64> {
        self.check_len(params)?;
        self.finish(self.log_prob_unconstrained(params), "log density")
    }

    /// Log density on the natural scale (no Jacobian).
    ///
    /// Returns `Ok(-inf)` for non-positive scales, a non-simplex `θ_j`, or an
    /// `L_Ω` that is not a correlation Cholesky factor; `Err` for wrong shapes.
    pub fn log_density_params(&self, p: &ModelParams) -> Result<f64> {
        match self.natural_from_params(p)? {
            None => Ok(f64::NEG_INFINITY),
            Some(nat) => self.finish(self.log_prob_natural(&nat), "log density"),
        }
    }

    /// Sum of the prior terms only, on the natural scale.
    pub fn log_prior_params(&self, p: &ModelParams) -> Result<f64> {
        match self.natural_from_params(p)? {
            None => Ok(f64::NEG_INFINITY),
            Some(nat) => self.finish(self.log_prior(&nat), "log prior"),
        }
    }

    /// Per-observation log-likelihood, ordered `[mixture..., CMR...]`.
    ///
    /// Ignores `prior_only`: these are the predictive densities used by LOO.
    pub fn pointwise_log_lik(&self, p: &ModelParams) -> Result<Vec<f64>> {
        let nat = self.natural_in_support(p)?;
        let tables = self.tables_in_support(&nat)?;
        Ok(self.pointwise_from_tables(&nat, &tables))
    }

    pub(crate) fn pointwise_from_tables(
        &self,
        nat: &Natural<f64>,
        tables: &SiteTables<f64>,
    ) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_mixture() + self.n_cmr());
        if let Some(sm) = nat.sigma_mix {
            out.par_extend(
                (0..self.n_mixture()).into_par_iter().map(|i| self.mixture_obs_log_lik(i, tables, sm)),
            );
        }
        if let Some(sc) = nat.sigma_cmr {
            out.par_extend(
                (0..self.n_cmr()).into_par_iter().map(|i| self.cmr_obs_log_lik(i, tables, sc)),
            );
        }
        out
    }

    /// Unconstrained vector to natural-scale parameters (with derived
    /// deviations and per-site growth parameters).
    pub fn unpack(&self, params: &[f64]) -> Result<ModelParams> {
        self.check_len(params)?;
        let (nat, _) = self.constrain(params);
        Ok(self.to_params(nat))
    }

    pub(crate) fn to_params(&self, nat: Natural<f64>) -> ModelParams {
        let tables = self.site_tables(&nat);
        let a = self.layout.n_classes();
        let theta = if a > 0 { nat.theta.chunks_exact(a).map(|t| t.to_vec()).collect() } else { Vec::new() };
        let sites = (0..self.layout.n_sites())
            .map(|j| SiteGrowth {
                l0: tables.l0.get(j).copied(),
                linf: tables.linf[j],
                k: tables.k[j],
            })
            .collect();
        ModelParams {
            b0: nat.b0,
            beta_linf: nat.beta_linf,
            beta_k: nat.beta_k,
            sigma_vb: nat.sigma_vb,
            l_omega: nat.l_omega,
            z: nat.z,
            sigma_mix: nat.sigma_mix,
            sigma_cmr: nat.sigma_cmr,
            theta,
            eps: tables.eps,
            sites,
        }
    }

    /// Recompute `eps` and `sites` of a natural-scale parameter set.
    pub fn complete(&self, p: ModelParams) -> Result<ModelParams> {
        self.natural_from_params(&p)?;
        let nat = Natural {
            b0: p.b0,
            beta_linf: p.beta_linf,
            beta_k: p.beta_k,
            sigma_vb: p.sigma_vb,
            l_omega: p.l_omega,
            z: p.z,
            sigma_mix: p.sigma_mix,
            sigma_cmr: p.sigma_cmr,
            theta: p.theta.concat(),
        };
        Ok(self.to_params(nat))
    }

    /// Natural-scale parameters to the unconstrained vector.
    pub fn pack(&self, p: &ModelParams) -> Result<Vec<f64>> {
        let nat = self.natural_in_support(p)?;
        let lay = &self.layout;
        let mut u = vec![0.0; lay.dim()];
        u[lay.b0()].copy_from_slice(&nat.b0);
        u[lay.beta_linf()].copy_from_slice(&nat.beta_linf);
        u[lay.beta_k()].copy_from_slice(&nat.beta_k);
        for (dst, s) in u[lay.log_sigma_vb()].iter_mut().zip(&nat.sigma_vb) {
            *dst = s.ln();
        }
        u[lay.l_omega_raw()].copy_from_slice(&cholesky_corr_unconstrain(&nat.l_omega, lay.k()));
        u[lay.z()].copy_from_slice(&nat.z);
        if let (Some(i), Some(s)) = (lay.log_sigma_mix(), nat.sigma_mix) {
            u[i] = s.ln();
        }
        if let (Some(i), Some(s)) = (lay.log_sigma_cmr(), nat.sigma_cmr) {
            u[i] = s.ln();
        }
        let a = lay.n_classes();
        if a > 0 {
            let raw: Vec<f64> = p.theta.iter().flat_map(|t| simplex_unconstrain(t)).collect();
            u[lay.theta_raw()].copy_from_slice(&raw);
        }
        Ok(u)
    }

    /// Gradient of the log density by forward-mode AD, one pass per
    /// coordinate, passes run in parallel.
    pub fn grad_log_density(&self, params: &[f64]) -> Result<Vec<f64>> {
        self.check_len(params)?;
        let lp = self.log_density(params)?;
        if !lp.is_finite() {
            return Err(Error::Validation(
                "gradient is undefined where the log density is -inf".into(),
            ));
        }
        let grad: Vec<f64> = (0..params.len())
            .into_par_iter()
            .map(|i| {
                let u: Vec<Dual> = params
                    .iter()
                    .enumerate()
                    .map(|(j, &v)| if i == j { Dual::var(v) } else { Dual::constant(v) })
                    .collect();
                self.log_prob_unconstrained(&u).dot
            })
            .collect();
        if let Some(i) = grad.iter().position(|g| !g.is_finite()) {
            log::warn!("non-finite gradient component {} ({})", i, self.layout.names()[i]);
            return Err(Error::Computation(format!(
                "gradient component {} is not finite",
                i
            )));
        }
        Ok(grad)
    }
}

impl LogDensityModel for GrowthModel {
    type Prepared<'a>
        = PreparedModelRef<'a, Self>
    where
        Self: 'a;

    fn dim(&self) -> usize {
        self.layout.dim()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.layout.names()
    }

    fn parameter_bounds(&self) -> Vec<(f64, f64)> {
        vec![(f64::NEG_INFINITY, f64::INFINITY); self.layout.dim()]
    }

    fn parameter_init(&self) -> Vec<f64> {
        let lay = &self.layout;
        let mut u = vec![0.0; lay.dim()];
        for (dst, p) in u[lay.b0()].iter_mut().zip(&self.intercept_priors) {
            *dst = p.mean;
        }
        for dst in &mut u[lay.log_sigma_vb()] {
            *dst = 0.1f64.ln();
        }
        for i in lay.log_sigma_mix().into_iter().chain(lay.log_sigma_cmr()) {
            u[i] = 0.2f64.ln();
        }
        u
    }

    fn nll(&self, params: &[f64]) -> Result<f64> {
        Ok(-self.log_density(params)?)
    }

    fn grad_nll(&self, params: &[f64]) -> Result<Vec<f64>> {
        Ok(self.grad_log_density(params)?.into_iter().map(|g| -g).collect())
    }

    fn prepared(&self) -> Self::Prepared<'_> {
        PreparedModelRef::new(self)
    }
}
