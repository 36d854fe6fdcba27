//! Posterior-predictive draws ("generated quantities").
//!
//! For one parameter draw: a sampled age class and replicated length per
//! mixture observation, a replicated recapture length per CMR observation,
//! and the marginal log-likelihood of every observation. Vectors are ordered
//! `[mixture..., CMR...]`, the order LOO consumes.

use fg_core::{Error, GeneratedDraw, GeneratedQuantities, Result};
use rand::distributions::WeightedIndex;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, LogNormal};
use serde::{Deserialize, Serialize};

use crate::density::{GrowthModel, Natural};
use crate::growth::recapture_mean_length;
use crate::params::ModelParams;

/// Replicated data and pointwise log-likelihood for one draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveDraw {
    /// Sampled age class per mixture observation.
    pub comp: Vec<usize>,
    /// Replicated observations, `[mixture..., CMR...]`.
    pub y_rep: Vec<f64>,
    /// Marginal log-likelihood of each actual observation, same order.
    pub log_lik: Vec<f64>,
}

impl From<PredictiveDraw> for GeneratedDraw {
    fn from(d: PredictiveDraw) -> Self {
        GeneratedDraw { y_rep: d.y_rep, log_lik: d.log_lik }
    }
}

fn lognormal(mu: f64, sigma: f64) -> Result<LogNormal<f64>> {
    LogNormal::new(mu, sigma)
        .map_err(|e| Error::Computation(format!("lognormal({}, {}): {}", mu, sigma, e)))
}

impl GrowthModel {
    /// Posterior-predictive draw at natural-scale parameters.
    pub fn posterior_predictive<R: Rng + ?Sized>(
        &self,
        p: &ModelParams,
        rng: &mut R,
    ) -> Result<PredictiveDraw> {
        let nat = self.natural_in_support(p)?;
        self.predictive_from_natural(&nat, rng)
    }

    pub(crate) fn predictive_from_natural<R: Rng + ?Sized>(
        &self,
        nat: &Natural<f64>,
        rng: &mut R,
    ) -> Result<PredictiveDraw> {
        let tables = self.tables_in_support(nat)?;
        let log_lik = self.pointwise_from_tables(nat, &tables);
        let n_mix = self.n_mixture();
        let mut comp = Vec::with_capacity(n_mix);
        let mut y_rep = Vec::with_capacity(n_mix + self.n_cmr());

        if let (Some(mix), Some(sigma)) = (self.data().mixture(), nat.sigma_mix) {
            let a = self.layout().n_classes();
            let pickers = nat
                .theta
                .chunks_exact(a)
                .map(|t| {
                    WeightedIndex::<f64>::new(t).map_err(|e| {
                        Error::Computation(format!("invalid class proportions: {}", e))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            for &j in mix.sites() {
                let cls = pickers[j].sample(rng);
                let y = lognormal(tables.log_mu[j * a + cls], sigma)?.sample(rng);
                comp.push(cls);
                y_rep.push(y);
            }
        }
        if let (Some(cmr), Some(sigma)) = (self.data().cmr(), nat.sigma_cmr) {
            for i in 0..self.n_cmr() {
                let j = cmr.sites()[i];
                let mu = recapture_mean_length(
                    cmr.capture_lengths()[i],
                    tables.linf[j],
                    tables.k[j],
                    cmr.days()[i],
                );
                y_rep.push(lognormal(mu.ln(), sigma)?.sample(rng));
            }
        }
        Ok(PredictiveDraw { comp, y_rep, log_lik })
    }
}

impl GeneratedQuantities for GrowthModel {
    fn n_observations(&self) -> usize {
        self.n_mixture() + self.n_cmr()
    }

    fn observed(&self) -> Vec<f64> {
        let mut y = Vec::with_capacity(self.n_observations());
        if self.n_mixture() > 0 {
            if let Some(m) = self.data().mixture() {
                y.extend_from_slice(m.lengths());
            }
        }
        if self.n_cmr() > 0 {
            if let Some(c) = self.data().cmr() {
                y.extend_from_slice(c.recapture_lengths());
            }
        }
        y
    }

    fn generated_quantities(&self, params: &[f64], rng: &mut dyn RngCore) -> Result<GeneratedDraw> {
        if params.len() != self.layout().dim() {
            return Err(Error::Validation(format!(
                "expected {} parameters, got {}",
                self.layout().dim(),
                params.len()
            )));
        }
        let (nat, _) = self.constrain(params);
        Ok(self.predictive_from_natural(&nat, rng)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, ModelVariant};
    use crate::data::{CmrData, GrowthData, MixtureData};
    use approx::assert_relative_eq;
    use fg_core::LogDensityModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model() -> GrowthModel {
        let mix = MixtureData::new(vec![30.0, 100.0, 160.0, 45.0], vec![0, 0, 1, 1]).unwrap();
        let cmr = CmrData::new(vec![1, 0], vec![90.0, 120.0], vec![130.0, 140.0], vec![300.0, 100.0])
            .unwrap();
        let data = GrowthData::new(2, Some(mix), Some(cmr)).unwrap();
        GrowthModel::new(data, ModelConfig::new(ModelVariant::Integrated, 4)).unwrap()
    }

    #[test]
    fn test_shapes_and_order() {
        let m = model();
        let u = m.parameter_init();
        let mut rng = StdRng::seed_from_u64(1);
        let p = m.unpack(&u).unwrap();
        let d = m.posterior_predictive(&p, &mut rng).unwrap();
        assert_eq!(d.comp.len(), 4);
        assert!(d.comp.iter().all(|&c| c < 4));
        assert_eq!(d.y_rep.len(), 6);
        assert!(d.y_rep.iter().all(|&y| y.is_finite() && y > 0.0));
        assert_eq!(m.observed(), vec![30.0, 100.0, 160.0, 45.0, 130.0, 140.0]);
        // log_lik is the marginal likelihood, independent of sampled classes.
        let ll = m.pointwise_log_lik(&p).unwrap();
        for (a, b) in d.log_lik.iter().zip(&ll) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let m = model();
        let u = m.parameter_init();
        let mut r1 = StdRng::seed_from_u64(99);
        let mut r2 = StdRng::seed_from_u64(99);
        let a = m.generated_quantities(&u, &mut r1).unwrap();
        let b = m.generated_quantities(&u, &mut r2).unwrap();
        assert_eq!(a, b);
        let mut r3 = StdRng::seed_from_u64(100);
        let c = m.generated_quantities(&u, &mut r3).unwrap();
        assert_ne!(a.y_rep, c.y_rep);
        assert_eq!(a.log_lik, c.log_lik);
    }

    #[test]
    fn test_class_frequencies_follow_theta() {
        let mix = MixtureData::new(vec![50.0; 4000], vec![0; 4000]).unwrap();
        let data = GrowthData::mixture_only(1, mix).unwrap();
        let m = GrowthModel::new(data, ModelConfig::new(ModelVariant::Mixture, 3)).unwrap();
        let mut p = m.unpack(&m.parameter_init()).unwrap();
        p.theta = vec![vec![0.6, 0.3, 0.1]];
        let mut rng = StdRng::seed_from_u64(5);
        let d = m.posterior_predictive(&p, &mut rng).unwrap();
        for (cls, &want) in [0.6, 0.3, 0.1].iter().enumerate() {
            let got = d.comp.iter().filter(|&&c| c == cls).count() as f64 / 4000.0;
            assert!((got - want).abs() < 0.03, "class {cls}: {got} vs {want}");
        }
    }

    #[test]
    fn test_wrong_length_is_error() {
        let m = model();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(m.generated_quantities(&[0.0; 3], &mut rng).is_err());
    }
}
