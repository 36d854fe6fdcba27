//! Flat unconstrained parameter layout.
//!
//! Blocks, in order (absent blocks have length 0):
//!
//! | block | length |
//! |---|---|
//! | `b0` | `K` |
//! | `beta_linf`, `beta_k` | `C` each |
//! | `log_sigma_vb` | `K` |
//! | `l_omega_raw` | `K(K-1)/2` |
//! | `z` | `J·K`, site-major |
//! | `log_sigma_mix` | 1 with a mixture term |
//! | `log_sigma_cmr` | 1 with a CMR term |
//! | `theta_raw` | `J·(A-1)` with a mixture term, site-major |

use std::ops::Range;

use fg_prob::transforms::cholesky_corr_free_dim;

use crate::config::ModelVariant;

/// Offsets of every block in the unconstrained vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterLayout {
    variant: ModelVariant,
    n_sites: usize,
    n_covariates: usize,
    n_classes: usize,
    b0: Range<usize>,
    beta_linf: Range<usize>,
    beta_k: Range<usize>,
    log_sigma_vb: Range<usize>,
    l_omega_raw: Range<usize>,
    z: Range<usize>,
    log_sigma_mix: Range<usize>,
    log_sigma_cmr: Range<usize>,
    theta_raw: Range<usize>,
}

impl ParameterLayout {
    /// Layout for `variant` with `n_sites` sites, `n_covariates` covariates
    /// and `n_classes` age classes (ignored without a mixture term).
    pub fn new(
        variant: ModelVariant,
        n_sites: usize,
        n_covariates: usize,
        n_classes: usize,
    ) -> Self {
        let k = variant.n_growth_params();
        let n_classes = if variant.has_mixture() { n_classes } else { 0 };
        let mut at = 0usize;
        let mut take = |len: usize| {
            let r = at..at + len;
            at += len;
            r
        };
        let b0 = take(k);
        let beta_linf = take(n_covariates);
        let beta_k = take(n_covariates);
        let log_sigma_vb = take(k);
        let l_omega_raw = take(cholesky_corr_free_dim(k));
        let z = take(n_sites * k);
        let log_sigma_mix = take(usize::from(variant.has_mixture()));
        let log_sigma_cmr = take(usize::from(variant.has_cmr()));
        let theta_raw = take(n_sites * n_classes.saturating_sub(1));
        Self {
            variant,
            n_sites,
            n_covariates,
            n_classes,
            b0,
            beta_linf,
            beta_k,
            log_sigma_vb,
            l_omega_raw,
            z,
            log_sigma_mix,
            log_sigma_cmr,
            theta_raw,
        }
    }

    /// Total number of unconstrained parameters.
    pub fn dim(&self) -> usize {
        self.theta_raw.end
    }

    /// Model variant.
    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Growth components per site (`K`).
    pub fn k(&self) -> usize {
        self.variant.n_growth_params()
    }

    /// Number of sites (`J`).
    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    /// Number of covariates (`C`).
    pub fn n_covariates(&self) -> usize {
        self.n_covariates
    }

    /// Number of age classes (`A`, 0 without a mixture term).
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Position of `Linf` among the growth components.
    pub fn linf_index(&self) -> usize {
        self.k() - 2
    }

    /// Position of `k` among the growth components.
    pub fn k_index(&self) -> usize {
        self.k() - 1
    }

    /// Log-scale intercepts.
    pub fn b0(&self) -> Range<usize> {
        self.b0.clone()
    }

    /// Covariate slopes on `log Linf`.
    pub fn beta_linf(&self) -> Range<usize> {
        self.beta_linf.clone()
    }

    /// Covariate slopes on `log k`.
    pub fn beta_k(&self) -> Range<usize> {
        self.beta_k.clone()
    }

    /// Log random-effect scales.
    pub fn log_sigma_vb(&self) -> Range<usize> {
        self.log_sigma_vb.clone()
    }

    /// Unconstrained correlation-Cholesky coordinates.
    pub fn l_omega_raw(&self) -> Range<usize> {
        self.l_omega_raw.clone()
    }

    /// Standard-normal site deviates.
    pub fn z(&self) -> Range<usize> {
        self.z.clone()
    }

    /// Log mixture observation scale, if present.
    pub fn log_sigma_mix(&self) -> Option<usize> {
        (!self.log_sigma_mix.is_empty()).then_some(self.log_sigma_mix.start)
    }

    /// Log CMR observation scale, if present.
    pub fn log_sigma_cmr(&self) -> Option<usize> {
        (!self.log_sigma_cmr.is_empty()).then_some(self.log_sigma_cmr.start)
    }

    /// Stick-breaking coordinates of the site class proportions.
    pub fn theta_raw(&self) -> Range<usize> {
        self.theta_raw.clone()
    }

    /// Parameter names in vector order.
    pub fn names(&self) -> Vec<String> {
        let comps = self.variant.component_names();
        let mut names = Vec::with_capacity(self.dim());
        names.extend(comps.iter().map(|c| format!("b0[{}]", c)));
        names.extend((0..self.n_covariates).map(|c| format!("beta_linf[{}]", c)));
        names.extend((0..self.n_covariates).map(|c| format!("beta_k[{}]", c)));
        names.extend(comps.iter().map(|c| format!("log_sigma_vb[{}]", c)));
        names.extend((0..self.l_omega_raw.len()).map(|i| format!("l_omega_raw[{}]", i)));
        for j in 0..self.n_sites {
            names.extend(comps.iter().map(|c| format!("z[{},{}]", j, c)));
        }
        if self.log_sigma_mix().is_some() {
            names.push("log_sigma_mix".into());
        }
        if self.log_sigma_cmr().is_some() {
            names.push("log_sigma_cmr".into());
        }
        if self.n_classes > 1 {
            for j in 0..self.n_sites {
                names.extend((0..self.n_classes - 1).map(|a| format!("theta_raw[{},{}]", j, a)));
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrated_layout() {
        let l = ParameterLayout::new(ModelVariant::Integrated, 4, 2, 5);
        assert_eq!(l.b0(), 0..3);
        assert_eq!(l.beta_linf(), 3..5);
        assert_eq!(l.beta_k(), 5..7);
        assert_eq!(l.log_sigma_vb(), 7..10);
        assert_eq!(l.l_omega_raw(), 10..13);
        assert_eq!(l.z(), 13..25);
        assert_eq!(l.log_sigma_mix(), Some(25));
        assert_eq!(l.log_sigma_cmr(), Some(26));
        assert_eq!(l.theta_raw(), 27..43);
        assert_eq!(l.dim(), 43);
        let names = l.names();
        assert_eq!(names.len(), l.dim());
        assert_eq!(names[0], "b0[L0]");
        assert_eq!(names[13 + 3 * 3 + 1], "z[3,Linf]");
        assert_eq!(names[42], "theta_raw[3,3]");
    }

    #[test]
    fn test_cmr_layout_has_no_mixture_blocks() {
        let l = ParameterLayout::new(ModelVariant::Cmr, 3, 0, 6);
        assert_eq!(l.k(), 2);
        assert_eq!(l.n_classes(), 0);
        assert_eq!(l.l_omega_raw().len(), 1);
        assert_eq!(l.log_sigma_mix(), None);
        assert!(l.theta_raw().is_empty());
        assert_eq!(l.dim(), 2 + 2 + 1 + 6 + 1);
        assert_eq!(l.names().len(), l.dim());
        assert_eq!((l.linf_index(), l.k_index()), (0, 1));
    }
}
