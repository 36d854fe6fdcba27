//! Generated quantities over every posterior draw.

use fg_core::{DrawMatrix, Error, GeneratedQuantities, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calibration::loo_pit_psis;
use crate::draws::PosteriorDraws;
use crate::loo::{LooFit, psis_loo};
use crate::psis::{PsisConfig, PsisWeights};

/// Pointwise log-likelihood and replicated data for all draws, plus the
/// observed values, all in the model's observation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDraws {
    /// Observed values.
    pub observed: Vec<f64>,
    /// Draws × observations log-likelihood.
    pub log_lik: DrawMatrix,
    /// Draws × observations replicated data.
    pub y_rep: DrawMatrix,
}

impl GeneratedDraws {
    /// PSIS-LOO of the log-likelihood matrix.
    pub fn loo(&self, config: &PsisConfig) -> Result<LooFit> {
        psis_loo(&self.log_lik, config)
    }

    /// LOO-PIT of the observed values under the given weights.
    pub fn loo_pit(&self, weights: &PsisWeights) -> Result<Vec<f64>> {
        loo_pit_psis(&self.observed, &self.y_rep, weights)
    }
}

/// Run the model's generated quantities on every draw.
///
/// Chains run in parallel; chain `c` uses a `StdRng` seeded with
/// `seed + c` and walks its draws in order, so the output does not depend
/// on thread scheduling.
pub fn generated_quantities_draws<M: GeneratedQuantities>(
    model: &M,
    draws: &PosteriorDraws,
    seed: u64,
) -> Result<GeneratedDraws> {
    if draws.n_params() != model.dim() {
        return Err(Error::Validation(format!(
            "draws have {} parameters, model has {}",
            draws.n_params(),
            model.dim()
        )));
    }
    let n_obs = model.n_observations();

    let per_chain: Vec<Result<(Vec<Vec<f64>>, Vec<Vec<f64>>)>> = draws
        .chains
        .par_iter()
        .enumerate()
        .map(|(chain_id, chain)| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(chain_id as u64));
            let mut ll = Vec::with_capacity(chain.len());
            let mut yr = Vec::with_capacity(chain.len());
            for (s, d) in chain.iter().enumerate() {
                let g = model.generated_quantities(d, &mut rng)?;
                if g.log_lik.len() != n_obs || g.y_rep.len() != n_obs {
                    return Err(Error::Computation(format!(
                        "chain {} draw {}: generated {} log_lik and {} y_rep values for {} observations",
                        chain_id,
                        s,
                        g.log_lik.len(),
                        g.y_rep.len(),
                        n_obs
                    )));
                }
                ll.push(g.log_lik);
                yr.push(g.y_rep);
            }
            Ok((ll, yr))
        })
        .collect();

    let mut log_lik = DrawMatrix::new(n_obs);
    let mut y_rep = DrawMatrix::new(n_obs);
    for (chain_id, res) in per_chain.into_iter().enumerate() {
        let (ll, yr) = res?;
        for (l, y) in ll.iter().zip(&yr) {
            log_lik.push_row(chain_id, l)?;
            y_rep.push_row(chain_id, y)?;
        }
    }
    log::debug!(
        "generated quantities: {} draws x {} observations",
        log_lik.n_draws(),
        n_obs
    );
    Ok(GeneratedDraws { observed: model.observed(), log_lik, y_rep })
}
