//! Model configuration (variant, age classes, prior hyperparameters).
//!
//! Every prior constant is a configuration value. Defaults are weakly
//! informative for temperate freshwater fish measured in millimetres and can
//! be overridden from JSON.

use fg_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which likelihood terms the model includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Length-frequency mixture over latent age classes.
    #[default]
    Mixture,
    /// Capture-mark-recapture growth increments.
    Cmr,
    /// Mixture and CMR likelihoods sharing `Linf`, `k` and their random effects.
    Integrated,
}

impl ModelVariant {
    /// Number of correlated growth parameters per site (`K`).
    ///
    /// 3 (`L0`, `Linf`, `k`) when a mixture term is present, 2 (`Linf`, `k`)
    /// for CMR alone, which has no population `L0`.
    pub fn n_growth_params(self) -> usize {
        match self {
            ModelVariant::Cmr => 2,
            ModelVariant::Mixture | ModelVariant::Integrated => 3,
        }
    }

    /// Whether the mixture likelihood is part of this variant.
    pub fn has_mixture(self) -> bool {
        matches!(self, ModelVariant::Mixture | ModelVariant::Integrated)
    }

    /// Whether the CMR likelihood is part of this variant.
    pub fn has_cmr(self) -> bool {
        matches!(self, ModelVariant::Cmr | ModelVariant::Integrated)
    }

    /// Names of the growth components, in parameter order.
    pub fn component_names(self) -> &'static [&'static str] {
        match self {
            ModelVariant::Cmr => &["Linf", "k"],
            ModelVariant::Mixture | ModelVariant::Integrated => &["L0", "Linf", "k"],
        }
    }
}

/// `Normal(mean, sd)` prior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalPrior {
    /// Prior mean.
    pub mean: f64,
    /// Prior standard deviation (> 0).
    pub sd: f64,
}

impl NormalPrior {
    /// Construct a prior.
    pub const fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }

    fn validate(&self, what: &str) -> Result<()> {
        if !self.mean.is_finite() || !self.sd.is_finite() || self.sd <= 0.0 {
            return Err(Error::Validation(format!(
                "{} prior needs finite mean and sd > 0, got mean={} sd={}",
                what, self.mean, self.sd
            )));
        }
        Ok(())
    }
}

/// Prior hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorConfig {
    /// Prior on `b0_L0 = ln L0` (population mean length at age 0).
    pub b0_l0: NormalPrior,
    /// Prior on `b0_Linf = ln Linf`.
    pub b0_linf: NormalPrior,
    /// Prior on `b0_k = ln k` (k in 1/year).
    pub b0_k: NormalPrior,
    /// Half-normal scales for `σ_VB`, ordered `[L0, Linf, k]`.
    /// The CMR variant uses the last two.
    pub sigma_vb_scale: [f64; 3],
    /// Half-normal scale for `σ_mix`.
    pub sigma_mix_scale: f64,
    /// Half-normal scale for `σ_cmr`.
    pub sigma_cmr_scale: f64,
    /// Standard deviation of the zero-mean normal prior on covariate slopes.
    pub beta_sd: f64,
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            b0_l0: NormalPrior::new(30f64.ln(), 1.0),
            b0_linf: NormalPrior::new(300f64.ln(), 1.0),
            b0_k: NormalPrior::new(0.3f64.ln(), 1.0),
            sigma_vb_scale: [0.5, 0.5, 0.5],
            sigma_mix_scale: 0.5,
            sigma_cmr_scale: 0.5,
            beta_sd: 1.0,
        }
    }
}

impl PriorConfig {
    /// Intercept priors for the components of `variant`, in parameter order.
    pub fn intercepts(&self, variant: ModelVariant) -> Vec<NormalPrior> {
        match variant {
            ModelVariant::Cmr => vec![self.b0_linf, self.b0_k],
            _ => vec![self.b0_l0, self.b0_linf, self.b0_k],
        }
    }

    /// `σ_VB` half-normal scales for the components of `variant`.
    pub fn sigma_vb_scales(&self, variant: ModelVariant) -> Vec<f64> {
        match variant {
            ModelVariant::Cmr => self.sigma_vb_scale[1..].to_vec(),
            _ => self.sigma_vb_scale.to_vec(),
        }
    }

    /// Validate every hyperparameter.
    pub fn validate(&self) -> Result<()> {
        self.b0_l0.validate("b0_l0")?;
        self.b0_linf.validate("b0_linf")?;
        self.b0_k.validate("b0_k")?;
        let scales = self
            .sigma_vb_scale
            .iter()
            .map(|&s| ("sigma_vb_scale", s))
            .chain([
                ("sigma_mix_scale", self.sigma_mix_scale),
                ("sigma_cmr_scale", self.sigma_cmr_scale),
                ("beta_sd", self.beta_sd),
            ]);
        for (name, s) in scales {
            if !s.is_finite() || s <= 0.0 {
                return Err(Error::Validation(format!(
                    "{} must be finite and > 0, got {}",
                    name, s
                )));
            }
        }
        Ok(())
    }
}

/// Full model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Which likelihood terms to include.
    pub variant: ModelVariant,
    /// Number of age classes `A` in the mixture (class `a` has age `a` years).
    pub n_age_classes: usize,
    /// Dirichlet concentration on each site's class proportions (length `A`).
    pub dirichlet_alpha: Vec<f64>,
    /// LKJ concentration `η` on the random-effects correlation.
    pub lkj_eta: f64,
    /// Drop all likelihood terms, keeping priors only.
    pub prior_only: bool,
    /// Prior hyperparameters.
    pub priors: PriorConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            variant: ModelVariant::Mixture,
            n_age_classes: 4,
            dirichlet_alpha: vec![1.0; 4],
            lkj_eta: 2.0,
            prior_only: false,
            priors: PriorConfig::default(),
        }
    }
}

impl ModelConfig {
    /// Default configuration for `variant` with `n_age_classes` classes and a
    /// flat Dirichlet.
    pub fn new(variant: ModelVariant, n_age_classes: usize) -> Self {
        Self {
            variant,
            n_age_classes,
            dirichlet_alpha: vec![1.0; n_age_classes],
            ..Self::default()
        }
    }

    /// Builder-style `prior_only` switch.
    pub fn with_prior_only(mut self, prior_only: bool) -> Self {
        self.prior_only = prior_only;
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration.
    ///
    /// Age classes and the Dirichlet concentration only matter when the
    /// variant has a mixture term.
    pub fn validate(&self) -> Result<()> {
        if self.variant.has_mixture() {
            if self.n_age_classes < 2 {
                return Err(Error::Validation(format!(
                    "n_age_classes must be >= 2, got {}",
                    self.n_age_classes
                )));
            }
            if self.dirichlet_alpha.len() != self.n_age_classes {
                return Err(Error::Validation(format!(
                    "dirichlet_alpha has length {}, expected n_age_classes = {}",
                    self.dirichlet_alpha.len(),
                    self.n_age_classes
                )));
            }
            fg_prob::dirichlet::validate_alpha(&self.dirichlet_alpha)?;
        }
        if !self.lkj_eta.is_finite() || self.lkj_eta < 0.0 {
            return Err(Error::Validation(format!(
                "lkj_eta must be finite and >= 0, got {}",
                self.lkj_eta
            )));
        }
        self.priors.validate()
    }
}
