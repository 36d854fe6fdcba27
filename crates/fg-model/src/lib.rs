//! # fg-model
//!
//! Hierarchical von Bertalanffy growth models for fish-length data.
//!
//! Two sampling designs share one growth function and one set of correlated
//! site random effects:
//! - length-frequency surveys, where each fish's age class is latent and
//!   marginalised out (the *mixture* variant);
//! - capture-mark-recapture pairs with known elapsed time (the *CMR* variant);
//! - both at once (the *integrated* variant).
//!
//! [`GrowthModel`] implements [`fg_core::LogDensityModel`] over a flat
//! unconstrained vector (see [`ParameterLayout`]) and
//! [`fg_core::GeneratedQuantities`] for posterior-predictive draws. The
//! [`simulate`] module produces synthetic datasets with known truth.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod data;
pub mod density;
pub mod growth;
pub mod layout;
pub mod params;
pub mod predictive;
pub mod random_effects;
pub mod simulate;

pub use config::{ModelConfig, ModelVariant, NormalPrior, PriorConfig};
pub use data::{CmrData, GrowthData, MixtureData, SiteCovariates};
pub use density::GrowthModel;
pub use growth::{mean_length, recapture_mean_length, DAYS_PER_YEAR};
pub use layout::ParameterLayout;
pub use params::{ModelParams, SiteGrowth};
pub use predictive::PredictiveDraw;
pub use simulate::{draw_prior, SimulatedData, SimulationConfig, SimulationTruth};
