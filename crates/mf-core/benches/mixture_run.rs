//! Criterion benchmarks for full inference runs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mf_core::inference::{infer, InferenceSettings, Scheduler};
use mf_core::model::{build_gaussian_mean_precision_model, build_mixture_model};
use mf_core::synth::{generate, Source};

fn three_clusters(n: usize) -> Vec<f64> {
    let sources = [
        Source::new(1.0, -10.0, 1.0).unwrap(),
        Source::new(1.0, 0.0, 1.0).unwrap(),
        Source::new(1.0, 10.0, 1.0).unwrap(),
    ];
    generate(&sources, n, 1).unwrap().0
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for n in [100usize, 1000] {
        let data = three_clusters(n);
        let (spec, _) = build_mixture_model(3, 0.0, 0.01, 2.0, 1.0, &[1.1], &data).unwrap();
        group.bench_with_input(BenchmarkId::new("mixture_k3", n), &n, |b, _| {
            b.iter(|| {
                let mut s = Scheduler::new(&spec, InferenceSettings::default()).unwrap();
                black_box(s.step().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");
    group.sample_size(20);

    let data = three_clusters(500);
    let (spec, _) = build_mixture_model(3, 0.0, 0.01, 2.0, 1.0, &[1.1], &data).unwrap();
    group.bench_function("mixture_k3_n500", |b| {
        b.iter(|| black_box(infer(&spec, InferenceSettings::default()).unwrap().elbo));
    });

    let (spec, _) = build_gaussian_mean_precision_model(0.0, 1.0, 2.0, 1.0, &data).unwrap();
    group.bench_function("mean_precision_n500", |b| {
        b.iter(|| black_box(infer(&spec, InferenceSettings::default()).unwrap().elbo));
    });

    group.finish();
}

criterion_group!(benches, bench_sweep, bench_run);
criterion_main!(benches);
