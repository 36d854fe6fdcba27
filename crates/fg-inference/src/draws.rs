//! Posterior draw storage.
//!
//! Draws come from an external engine in the model's unconstrained space,
//! one `Vec<Vec<f64>>` per chain.

use fg_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Multi-chain posterior draws in unconstrained space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorDraws {
    /// `chains[c][s]` is draw `s` of chain `c`.
    pub chains: Vec<Vec<Vec<f64>>>,
    /// Parameter names, one per coordinate.
    pub param_names: Vec<String>,
}

impl PosteriorDraws {
    /// Validate and wrap per-chain draws.
    ///
    /// Every draw must have one value per name, and every chain must hold
    /// at least one draw.
    pub fn new(chains: Vec<Vec<Vec<f64>>>, param_names: Vec<String>) -> Result<Self> {
        if chains.is_empty() {
            return Err(Error::Validation("posterior draws need at least one chain".into()));
        }
        let dim = param_names.len();
        for (c, chain) in chains.iter().enumerate() {
            if chain.is_empty() {
                return Err(Error::Validation(format!("chain {} has no draws", c)));
            }
            if let Some((s, d)) = chain.iter().enumerate().find(|(_, d)| d.len() != dim) {
                return Err(Error::Validation(format!(
                    "chain {} draw {} has {} values, expected {}",
                    c,
                    s,
                    d.len(),
                    dim
                )));
            }
        }
        Ok(Self { chains, param_names })
    }

    /// Number of chains.
    pub fn n_chains(&self) -> usize {
        self.chains.len()
    }

    /// Number of parameters per draw.
    pub fn n_params(&self) -> usize {
        self.param_names.len()
    }

    /// Total number of draws across all chains.
    pub fn total_draws(&self) -> usize {
        self.chains.iter().map(|c| c.len()).sum()
    }

    /// Draws for a single parameter (index) across all chains.
    pub fn param_draws(&self, param_idx: usize) -> Vec<Vec<f64>> {
        self.chains.iter().map(|c| c.iter().map(|d| d[param_idx]).collect()).collect()
    }

    /// Mean of a parameter across all draws and chains.
    pub fn param_mean(&self, param_idx: usize) -> f64 {
        let draws = self.param_draws(param_idx);
        let n: usize = draws.iter().map(|c| c.len()).sum();
        let sum: f64 = draws.iter().flat_map(|c| c.iter()).sum();
        sum / n as f64
    }

    /// Index of a parameter by name.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.param_names.iter().position(|n| n == name)
    }

    /// All draws, chains concatenated in order.
    pub fn flat(&self) -> Vec<&[f64]> {
        self.chains.iter().flat_map(|c| c.iter().map(|d| d.as_slice())).collect()
    }

    /// Chain id of every draw in [`flat`](Self::flat) order.
    pub fn chain_ids(&self) -> Vec<usize> {
        self.chains.iter().enumerate().flat_map(|(c, ch)| std::iter::repeat(c).take(ch.len())).collect()
    }
}
