use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;
use uav_mimo_link::capacity::LinkSimulator;
use uav_mimo_link::config::LinkConfig;
use uav_mimo_link::geo::Position;
use uav_mimo_link::io::{BaseStation, BaseStationConfig, Uav, UavConfig};

fn capacity_benchmark(c: &mut Criterion) {
    let bs = BaseStation::new(BaseStationConfig {
        location: Position::new(0.0, 0.0, 10.0),
        ..Default::default()
    })
    .unwrap();
    let uav = Uav::new(UavConfig {
        location: Position::new(50.0, 0.0, 10.0),
        ..Default::default()
    })
    .unwrap();

    let link = LinkConfig::default();
    let sim = LinkSimulator::new(&bs, &uav, bs.endpoint(), uav.endpoint(), bs.n_s(), link).unwrap();

    c.bench_function("single_trial", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        b.iter(|| sim.run_trial(black_box(&mut rng)).unwrap())
    });

    c.bench_function("mean_capacity_100_trials", |b| {
        b.iter(|| sim.estimate_mean_capacity_seeded(black_box(7)).unwrap())
    });
}

criterion_group!(benches, capacity_benchmark);
criterion_main!(benches);
