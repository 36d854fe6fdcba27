use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fg_core::DrawMatrix;
use fg_inference::{PsisConfig, loo_pit, psis_loo};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::hint::black_box;

fn log_lik_matrix(n_draws: usize, n_obs: usize, seed: u64) -> DrawMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.3).unwrap();
    let rows: Vec<Vec<f64>> = (0..n_draws)
        .map(|_| (0..n_obs).map(|i| -1.0 - (i % 7) as f64 * 0.2 + noise.sample(&mut rng)).collect())
        .collect();
    let chain_ids: Vec<usize> = (0..n_draws).map(|s| s * 4 / n_draws).collect();
    DrawMatrix::from_rows(&rows, &chain_ids).unwrap()
}

fn bench_psis_loo(c: &mut Criterion) {
    let mut group = c.benchmark_group("psis_loo");
    for &n_obs in &[100usize, 1000] {
        let ll = log_lik_matrix(1000, n_obs, 7);
        group.bench_with_input(BenchmarkId::from_parameter(n_obs), &ll, |b, ll| {
            b.iter(|| black_box(psis_loo(ll, &PsisConfig::default()).unwrap()))
        });
    }
    group.finish();

    let ll = log_lik_matrix(1000, 500, 8);
    let y_rep = log_lik_matrix(1000, 500, 9);
    let fit = psis_loo(&ll, &PsisConfig::default()).unwrap();
    let y_obs = vec![-1.5; 500];
    c.bench_function("loo_pit_1000x500", |b| {
        b.iter(|| black_box(loo_pit(&y_obs, &y_rep, &fit.weights.log_weights).unwrap()))
    });
}

criterion_group!(benches, bench_psis_loo);
criterion_main!(benches);
