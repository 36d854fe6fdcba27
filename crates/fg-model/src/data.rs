//! Validated observation tables.
//!
//! Everything is checked once at construction so the density never sees a
//! malformed row. Site indices are 0-based.

use fg_core::{Error, Result};
use serde::{Deserialize, Serialize};

fn check_positive(what: &str, xs: &[f64]) -> Result<()> {
    for (i, &x) in xs.iter().enumerate() {
        if !x.is_finite() || x <= 0.0 {
            return Err(Error::Validation(format!(
                "{}[{}] must be finite and > 0, got {}",
                what, i, x
            )));
        }
    }
    Ok(())
}

fn check_sites(what: &str, sites: &[usize], n_sites: usize) -> Result<()> {
    if let Some((i, &s)) = sites.iter().enumerate().find(|&(_, &s)| s >= n_sites) {
        return Err(Error::Validation(format!(
            "{} site[{}] = {} out of range for {} sites",
            what, i, s, n_sites
        )));
    }
    Ok(())
}

/// Length-frequency observations: one length per fish, age unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureData {
    lengths: Vec<f64>,
    sites: Vec<usize>,
}

impl MixtureData {
    /// Create from parallel columns.
    pub fn new(lengths: Vec<f64>, sites: Vec<usize>) -> Result<Self> {
        if lengths.len() != sites.len() {
            return Err(Error::Validation(format!(
                "mixture lengths and sites differ in length: {} vs {}",
                lengths.len(),
                sites.len()
            )));
        }
        if lengths.is_empty() {
            return Err(Error::Validation("mixture data has no observations".into()));
        }
        check_positive("mixture length", &lengths)?;
        Ok(Self { lengths, sites })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    /// Always `false` for constructed data.
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Observed lengths.
    pub fn lengths(&self) -> &[f64] {
        &self.lengths
    }

    /// Site index per observation.
    pub fn sites(&self) -> &[usize] {
        &self.sites
    }
}

/// Capture-mark-recapture pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmrData {
    sites: Vec<usize>,
    capture_lengths: Vec<f64>,
    recapture_lengths: Vec<f64>,
    days: Vec<f64>,
}

impl CmrData {
    /// Create from parallel columns.
    pub fn new(
        sites: Vec<usize>,
        capture_lengths: Vec<f64>,
        recapture_lengths: Vec<f64>,
        days: Vec<f64>,
    ) -> Result<Self> {
        let n = sites.len();
        if capture_lengths.len() != n || recapture_lengths.len() != n || days.len() != n {
            return Err(Error::Validation(format!(
                "CMR columns differ in length: sites={} capture={} recapture={} days={}",
                n,
                capture_lengths.len(),
                recapture_lengths.len(),
                days.len()
            )));
        }
        if n == 0 {
            return Err(Error::Validation("CMR data has no observations".into()));
        }
        check_positive("capture length", &capture_lengths)?;
        check_positive("recapture length", &recapture_lengths)?;
        for (i, &d) in days.iter().enumerate() {
            if !d.is_finite() || d < 0.0 {
                return Err(Error::Validation(format!(
                    "days[{}] must be finite and >= 0, got {}",
                    i, d
                )));
            }
        }
        Ok(Self { sites, capture_lengths, recapture_lengths, days })
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Always `false` for constructed data.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Site index per pair.
    pub fn sites(&self) -> &[usize] {
        &self.sites
    }

    /// Length at first capture (a covariate, not modelled).
    pub fn capture_lengths(&self) -> &[f64] {
        &self.capture_lengths
    }

    /// Length at recapture (the response).
    pub fn recapture_lengths(&self) -> &[f64] {
        &self.recapture_lengths
    }

    /// Days between capture and recapture.
    pub fn days(&self) -> &[f64] {
        &self.days
    }
}

/// Site-level covariates, standardised per column (mean 0, sd 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCovariates {
    names: Vec<String>,
    n_sites: usize,
    /// Row-major `n_sites × n_covariates`, standardised.
    values: Vec<f64>,
    /// Raw column means and sds used for standardisation.
    center: Vec<f64>,
    scale: Vec<f64>,
}

impl SiteCovariates {
    /// Standardise raw covariates given as one row per site (row `j` is site `j`).
    pub fn new(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let n_sites = rows.len();
        let c = names.len();
        if n_sites == 0 || c == 0 {
            return Err(Error::Validation(format!(
                "covariate table must be non-empty, got {} sites x {} columns",
                n_sites, c
            )));
        }
        for (j, r) in rows.iter().enumerate() {
            if r.len() != c {
                return Err(Error::Validation(format!(
                    "covariate row {} has {} values, expected {}",
                    j,
                    r.len(),
                    c
                )));
            }
            if let Some(v) = r.iter().find(|v| !v.is_finite()) {
                return Err(Error::Validation(format!(
                    "covariate row {} has non-finite value {}",
                    j, v
                )));
            }
        }
        let nf = n_sites as f64;
        let mut center = vec![0.0; c];
        let mut scale = vec![0.0; c];
        for col in 0..c {
            let mean = rows.iter().map(|r| r[col]).sum::<f64>() / nf;
            let var = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / nf;
            let sd = var.sqrt();
            if !(sd > 1e-12 * (1.0 + mean.abs())) {
                return Err(Error::Validation(format!(
                    "covariate '{}' has zero variance across sites",
                    names[col]
                )));
            }
            center[col] = mean;
            scale[col] = sd;
        }
        let mut values = Vec::with_capacity(n_sites * c);
        for r in rows {
            values.extend(r.iter().enumerate().map(|(col, &v)| (v - center[col]) / scale[col]));
        }
        Ok(Self { names, n_sites, values, center, scale })
    }

    /// Number of covariates `C`.
    pub fn n_covariates(&self) -> usize {
        self.names.len()
    }

    /// Number of sites.
    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    /// Covariate names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Standardised covariates of site `j`.
    pub fn site(&self, j: usize) -> &[f64] {
        let c = self.names.len();
        &self.values[j * c..(j + 1) * c]
    }

    /// Raw-scale `(mean, sd)` of each column.
    pub fn standardisation(&self) -> (&[f64], &[f64]) {
        (&self.center, &self.scale)
    }
}

/// A complete dataset: site count plus whichever tables are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthData {
    n_sites: usize,
    mixture: Option<MixtureData>,
    cmr: Option<CmrData>,
    covariates: Option<SiteCovariates>,
}

impl GrowthData {
    /// Combine tables over `n_sites` sites.
    ///
    /// At least one table is required and every site index must be `< n_sites`.
    pub fn new(n_sites: usize, mixture: Option<MixtureData>, cmr: Option<CmrData>) -> Result<Self> {
        if n_sites == 0 {
            return Err(Error::Validation("at least one site required".into()));
        }
        if mixture.is_none() && cmr.is_none() {
            return Err(Error::Validation("dataset has neither mixture nor CMR data".into()));
        }
        if let Some(m) = &mixture {
            check_sites("mixture", m.sites(), n_sites)?;
        }
        if let Some(c) = &cmr {
            check_sites("CMR", c.sites(), n_sites)?;
        }
        Ok(Self { n_sites, mixture, cmr, covariates: None })
    }

    /// Mixture-only dataset.
    pub fn mixture_only(n_sites: usize, mixture: MixtureData) -> Result<Self> {
        Self::new(n_sites, Some(mixture), None)
    }

    /// CMR-only dataset.
    pub fn cmr_only(n_sites: usize, cmr: CmrData) -> Result<Self> {
        Self::new(n_sites, None, Some(cmr))
    }

    /// Attach site covariates (one row per site).
    pub fn with_covariates(mut self, covariates: SiteCovariates) -> Result<Self> {
        if covariates.n_sites() != self.n_sites {
            return Err(Error::Validation(format!(
                "covariate table has {} sites, dataset has {}",
                covariates.n_sites(),
                self.n_sites
            )));
        }
        self.covariates = Some(covariates);
        Ok(self)
    }

    /// Number of sites `J`.
    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    /// Mixture table, if any.
    pub fn mixture(&self) -> Option<&MixtureData> {
        self.mixture.as_ref()
    }

    /// CMR table, if any.
    pub fn cmr(&self) -> Option<&CmrData> {
        self.cmr.as_ref()
    }

    /// Site covariates, if any.
    pub fn covariates(&self) -> Option<&SiteCovariates> {
        self.covariates.as_ref()
    }

    /// Number of covariates `C` (0 without a covariate table).
    pub fn n_covariates(&self) -> usize {
        self.covariates.as_ref().map_or(0, |c| c.n_covariates())
    }
}
