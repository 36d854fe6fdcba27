//! Simulate → draws → generated quantities → PSIS-LOO → LOO-PIT.

use approx::assert_relative_eq;
use fg_core::GeneratedQuantities;
use fg_inference::{
    GeneratedDraws, PosteriorDraws, PsisConfig, compute_diagnostics, generated_quantities_draws,
    ks_uniform, loo_compare,
};
use fg_model::simulate::simulate_seeded;
use fg_model::{GrowthModel, ModelConfig, ModelParams, ModelVariant, SimulationConfig};
use fg_prob::math::log_sum_exp;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

fn setup(seed: u64) -> (GrowthModel, ModelParams) {
    let cfg = SimulationConfig { n_sites: 8, n_mixture: 300, n_cmr: 150, ..Default::default() };
    let sim = simulate_seeded(&cfg, ModelVariant::Integrated, seed).unwrap();
    let model =
        GrowthModel::new(sim.data, ModelConfig::new(ModelVariant::Integrated, 4)).unwrap();
    (model, sim.truth.params)
}

fn point_mass(u: &[f64], n_chains: usize, n_draws: usize, names: Vec<String>) -> PosteriorDraws {
    PosteriorDraws::new(vec![vec![u.to_vec(); n_draws]; n_chains], names).unwrap()
}

fn jittered(u: &[f64], n_chains: usize, n_draws: usize, sd: f64, names: Vec<String>) -> PosteriorDraws {
    let noise = Normal::new(0.0, sd).unwrap();
    let chains = (0..n_chains)
        .map(|c| {
            let mut rng = StdRng::seed_from_u64(100 + c as u64);
            (0..n_draws)
                .map(|_| u.iter().map(|&x| x + noise.sample(&mut rng)).collect())
                .collect()
        })
        .collect();
    PosteriorDraws::new(chains, names).unwrap()
}

fn generate(model: &GrowthModel, draws: &PosteriorDraws) -> GeneratedDraws {
    generated_quantities_draws(model, draws, 2024).unwrap()
}

#[test]
fn loo_pit_is_uniform_when_data_come_from_the_model() {
    let (model, truth) = setup(11);
    let u = model.pack(&truth).unwrap();
    let draws = point_mass(&u, 4, 100, model.layout().names());
    let g = generate(&model, &draws);

    assert_eq!(g.observed, model.observed());
    assert_eq!(g.log_lik.n_obs(), 450);
    let at_truth = model.pointwise_log_lik(&truth).unwrap();
    for (a, b) in g.log_lik.row(123).iter().zip(&at_truth) {
        assert_relative_eq!(a, b, epsilon = 1e-9);
    }

    let fit = g.loo(&PsisConfig::default()).unwrap();
    assert!(fit.result.flagged.is_empty());
    let pit = g.loo_pit(&fit.weights).unwrap();
    let ks = ks_uniform(&pit).unwrap();
    assert!(ks.p_value > 0.01, "KS rejects uniformity: D={} p={}", ks.statistic, ks.p_value);
}

#[test]
fn psis_weights_are_finite_for_a_diffuse_posterior() {
    let (model, truth) = setup(12);
    let u = model.pack(&truth).unwrap();
    let draws = jittered(&u, 4, 150, 0.01, model.layout().names());

    let diag = compute_diagnostics(&draws);
    assert!(diag.max_r_hat() < 1.1);

    let g = generate(&model, &draws);
    let fit = g.loo(&PsisConfig::default()).unwrap();
    let w = &fit.weights;
    assert_eq!(w.n_draws(), 600);
    for i in 0..w.n_obs() {
        let col = w.column(i);
        assert!(col.iter().all(|x| x.is_finite()), "observation {i}");
        assert_relative_eq!(log_sum_exp(&col), 0.0, epsilon = 1e-9);
        assert!(!w.pareto_k[i].is_nan(), "observation {i}");
        assert!(w.r_eff[i] > 0.0);
    }
    let r = &fit.result;
    assert!(r.elpd_loo.is_finite() && r.se_elpd_loo > 0.0);
    assert_eq!(r.pointwise.len(), 450);
    assert_eq!(r.category_counts().iter().sum::<usize>(), 450);
}

#[test]
fn misspecified_growth_rate_loses_the_comparison() {
    let (model, truth) = setup(13);
    let names = model.layout().names();
    let good = model.pack(&truth).unwrap();
    let mut wrong_params = truth.clone();
    wrong_params.b0[2] += 2f64.ln();
    let wrong = model.pack(&wrong_params).unwrap();

    let cfg = PsisConfig::default();
    let a = generate(&model, &jittered(&good, 2, 100, 0.005, names.clone())).loo(&cfg).unwrap();
    let b = generate(&model, &jittered(&wrong, 2, 100, 0.005, names)).loo(&cfg).unwrap();
    let cmp = loo_compare(&a.result, &b.result).unwrap();
    assert!(cmp.elpd_diff > 0.0);
    assert!(cmp.elpd_diff > 2.0 * cmp.se_diff, "{:?}", cmp);
}
