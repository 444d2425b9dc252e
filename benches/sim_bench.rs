use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pubsim::engine::allocate_milestones;
use pubsim::engine::TheoryData;
use pubsim::logspace::{add, add2};
use pubsim::progress::{CancelFlag, Progress, RunContext};
use pubsim::settings::Settings;
use pubsim::theory::{run_theory, TheoryId};

fn bench_add2(c: &mut Criterion) {
    c.bench_function("logspace::add2", |b| {
        b.iter(|| add2(black_box(123.456), black_box(122.789)));
    });
}

fn bench_add_fold(c: &mut Criterion) {
    let terms = [101.2, 99.7, 103.4, 100.0, 98.6];
    c.bench_function("logspace::add(5 terms)", |b| {
        b.iter(|| add(black_box(&terms)));
    });
}

fn bench_allocate_milestones(c: &mut Criterion) {
    let max = [2u32, 2, 3, 3];
    let priority = [2usize, 3, 0, 1];
    c.bench_function("allocate_milestones(7)", |b| {
        b.iter(|| allocate_milestones(black_box(7), black_box(&max), black_box(&priority)));
    });
}

fn bench_t1_short_pub(c: &mut Criterion) {
    let cancel = CancelFlag::new();
    let progress = Progress::new();
    let ctx = RunContext::new(&cancel, &progress);
    let data = TheoryData {
        theory: TheoryId::T1,
        sigma: 20,
        rho: 10.0,
        strat: "T1".to_string(),
        recovery: None,
        cap: Some(40.0),
        settings: Settings::default(),
    };
    c.bench_function("run_theory(T1, e10..e40)", |b| {
        b.iter(|| run_theory(black_box(&data), black_box(&ctx)).unwrap());
    });
}

fn bench_t6_short_pub(c: &mut Criterion) {
    let cancel = CancelFlag::new();
    let progress = Progress::new();
    let ctx = RunContext::new(&cancel, &progress);
    let data = TheoryData {
        theory: TheoryId::T6,
        sigma: 20,
        rho: 15.0,
        strat: "T6".to_string(),
        recovery: None,
        cap: Some(40.0),
        settings: Settings::default(),
    };
    c.bench_function("run_theory(T6, e15..e40)", |b| {
        b.iter(|| run_theory(black_box(&data), black_box(&ctx)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_add2,
    bench_add_fold,
    bench_allocate_milestones,
    bench_t1_short_pub,
    bench_t6_short_pub,
);
criterion_main!(benches);
