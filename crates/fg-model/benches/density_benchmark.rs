use criterion::{Criterion, criterion_group, criterion_main};
use fg_core::{GeneratedQuantities, LogDensityModel};
use fg_model::simulate::simulate_seeded;
use fg_model::{GrowthModel, ModelConfig, ModelVariant, SimulationConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

fn integrated_model() -> (GrowthModel, Vec<f64>) {
    let cfg = SimulationConfig { n_sites: 20, n_mixture: 2000, n_cmr: 500, ..Default::default() };
    let sim = simulate_seeded(&cfg, ModelVariant::Integrated, 42).expect("simulate");
    let model = GrowthModel::new(sim.data, ModelConfig::new(ModelVariant::Integrated, 4))
        .expect("model");
    let u = model.pack(&sim.truth.params).expect("pack");
    (model, u)
}

fn bench_density(c: &mut Criterion) {
    let (model, u) = integrated_model();

    c.bench_function("log_density_integrated_2500", |b| {
        b.iter(|| black_box(model.log_density(black_box(&u)).unwrap()))
    });

    c.bench_function("grad_nll_integrated_2500", |b| {
        b.iter(|| black_box(model.grad_nll(black_box(&u)).unwrap()))
    });

    c.bench_function("generated_quantities_integrated_2500", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        b.iter(|| black_box(model.generated_quantities(&u, &mut rng).unwrap()))
    });
}

criterion_group!(benches, bench_density);
criterion_main!(benches);
