//! Criterion benchmarks for `mf-math`.
//!
//! Focus on the kernels evaluated once per variable per sweep.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mf_math::{digamma, log_gamma, Categorical, Dirichlet, Gamma};

fn bench_special_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("special");

    for (name, x) in [("small", 0.3), ("unit", 1.0), ("large", 512.5)] {
        group.bench_with_input(BenchmarkId::new("digamma", name), &x, |b, &x| {
            b.iter(|| black_box(digamma(black_box(x))));
        });
        group.bench_with_input(BenchmarkId::new("log_gamma", name), &x, |b, &x| {
            b.iter(|| black_box(log_gamma(black_box(x))));
        });
    }

    group.finish();
}

fn bench_kl(c: &mut Criterion) {
    let mut group = c.benchmark_group("kl");

    let q = Gamma::new(52.0, 27.5).unwrap();
    let p = Gamma::new(2.0, 1.0).unwrap();
    group.bench_function("gamma", |b| b.iter(|| black_box(q.kl_divergence(black_box(&p)))));

    for k in [3usize, 16] {
        let q = Dirichlet::new((0..k).map(|i| 1.1 + i as f64 * 7.0).collect()).unwrap();
        let p = Dirichlet::symmetric(k, 1.1).unwrap();
        group.bench_with_input(BenchmarkId::new("dirichlet", k), &k, |b, _| {
            b.iter(|| black_box(q.kl_divergence(black_box(&p))));
        });
    }

    group.finish();
}

fn bench_softmax(c: &mut Criterion) {
    let weights: Vec<f64> = (0..8).map(|i| -(i as f64) * 3.7).collect();
    c.bench_function("categorical/from_log_weights", |b| {
        b.iter(|| black_box(Categorical::from_log_weights(black_box(&weights))));
    });
}

criterion_group!(benches, bench_special_functions, bench_kl, bench_softmax);
criterion_main!(benches);
