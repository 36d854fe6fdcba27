//! Common data types for FishGrowth

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Generated quantities of a single posterior draw.
///
/// Both vectors use the concatenated observation order
/// `[mixture observations..., CMR observations...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDraw {
    /// Replicated observations.
    pub y_rep: Vec<f64>,
    /// Pointwise log-likelihood of the *observed* data under this draw.
    pub log_lik: Vec<f64>,
}

/// Dense draws × observations matrix (row-major), with the chain each draw came from.
///
/// Used for pointwise log-likelihood and replicated data. Observation columns
/// must line up exactly across chains; rows may arrive chain by chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawMatrix {
    n_obs: usize,
    chain_ids: Vec<usize>,
    values: Vec<f64>,
}

impl DrawMatrix {
    /// Create an empty matrix with a fixed number of observation columns.
    pub fn new(n_obs: usize) -> Self {
        Self { n_obs, chain_ids: Vec::new(), values: Vec::new() }
    }

    /// Build from per-draw rows and matching chain ids.
    pub fn from_rows(rows: &[Vec<f64>], chain_ids: &[usize]) -> Result<Self> {
        if rows.len() != chain_ids.len() {
            return Err(Error::Validation(format!(
                "rows and chain_ids must have the same length, got {} and {}",
                rows.len(),
                chain_ids.len()
            )));
        }
        let n_obs = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut m = Self::new(n_obs);
        m.values.reserve(rows.len() * n_obs);
        for (row, &c) in rows.iter().zip(chain_ids) {
            m.push_row(c, row)?;
        }
        Ok(m)
    }

    /// Build a single-chain matrix from rows.
    pub fn from_single_chain(rows: &[Vec<f64>]) -> Result<Self> {
        Self::from_rows(rows, &vec![0; rows.len()])
    }

    /// Append one draw.
    pub fn push_row(&mut self, chain_id: usize, row: &[f64]) -> Result<()> {
        if row.len() != self.n_obs {
            return Err(Error::Validation(format!(
                "row has {} observations, expected {}",
                row.len(),
                self.n_obs
            )));
        }
        self.values.extend_from_slice(row);
        self.chain_ids.push(chain_id);
        Ok(())
    }

    /// Append all draws of `other` (observation order must match).
    pub fn append(&mut self, other: &DrawMatrix) -> Result<()> {
        if other.n_obs != self.n_obs {
            return Err(Error::Validation(format!(
                "cannot append matrix with {} observations to one with {}",
                other.n_obs, self.n_obs
            )));
        }
        self.values.extend_from_slice(&other.values);
        self.chain_ids.extend_from_slice(&other.chain_ids);
        Ok(())
    }

    /// Number of draws (rows).
    pub fn n_draws(&self) -> usize {
        self.chain_ids.len()
    }

    /// Number of observations (columns).
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Chain id of each draw.
    pub fn chain_ids(&self) -> &[usize] {
        &self.chain_ids
    }

    /// Number of distinct chains.
    pub fn n_chains(&self) -> usize {
        let mut ids = self.chain_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Value at (draw, observation).
    #[inline]
    pub fn get(&self, draw: usize, obs: usize) -> f64 {
        self.values[draw * self.n_obs + obs]
    }

    /// One draw across all observations.
    pub fn row(&self, draw: usize) -> &[f64] {
        &self.values[draw * self.n_obs..(draw + 1) * self.n_obs]
    }

    /// One observation across all draws (all chains concatenated).
    pub fn column(&self, obs: usize) -> Vec<f64> {
        (0..self.n_draws()).map(|s| self.get(s, obs)).collect()
    }

    /// One observation across draws, split by chain (chains ordered by id).
    pub fn column_by_chain(&self, obs: usize) -> Vec<Vec<f64>> {
        let mut ids = self.chain_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids.iter()
            .map(|&c| {
                self.chain_ids
                    .iter()
                    .enumerate()
                    .filter(|&(_, &id)| id == c)
                    .map(|(s, _)| self.get(s, obs))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_matrix_layout() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]];
        let m = DrawMatrix::from_rows(&rows, &[0, 0, 1]).unwrap();
        assert_eq!(m.n_draws(), 3);
        assert_eq!(m.n_obs(), 3);
        assert_eq!(m.n_chains(), 2);
        assert_eq!(m.get(1, 2), 6.0);
        assert_eq!(m.row(2), &[7.0, 8.0, 9.0]);
        assert_eq!(m.column(0), vec![1.0, 4.0, 7.0]);
        assert_eq!(m.column_by_chain(1), vec![vec![2.0, 5.0], vec![8.0]]);
    }

    #[test]
    fn test_draw_matrix_rejects_misaligned_rows() {
        let mut m = DrawMatrix::new(2);
        assert!(m.push_row(0, &[1.0]).is_err());
        assert!(DrawMatrix::from_rows(&[vec![1.0]], &[0, 1]).is_err());
        let other = DrawMatrix::new(3);
        assert!(m.append(&other).is_err());
    }

    #[test]
    fn test_draw_matrix_append_keeps_chain_ids() {
        let mut a = DrawMatrix::from_single_chain(&[vec![1.0, 2.0]]).unwrap();
        let b = DrawMatrix::from_rows(&[vec![3.0, 4.0]], &[1]).unwrap();
        a.append(&b).unwrap();
        assert_eq!(a.chain_ids(), &[0, 1]);
        assert_eq!(a.column(1), vec![2.0, 4.0]);
    }
}
