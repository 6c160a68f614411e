//! # Settlement Performance Benchmark
//!
//! Measures the three hot operations:
//! - pair construction
//! - settle + drain with N pending continuations
//! - late subscription on an already-settled instance
//!
//! Run with: `cargo bench --package kedge_core`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kedge_core::Deferred;

/// Benchmark: construct a pending pair.
fn bench_pair_construction(c: &mut Criterion) {
    c.bench_function("pending_pair", |b| {
        b.iter(|| black_box(Deferred::<u64, String>::pending()));
    });
}

/// Benchmark: settle with N buffered continuations.
fn bench_settle_with_continuations(c: &mut Criterion) {
    let mut group = c.benchmark_group("settle_with_continuations");

    for count in [1_usize, 16, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let (deferred, settler) = Deferred::<u64, String>::pending();
                for _ in 0..count {
                    deferred.subscribe_outcome(|outcome| {
                        black_box(outcome.is_success());
                    });
                }
                settler.succeed(42)
            });
        });
    }

    group.finish();
}

/// Benchmark: subscribe after settlement (synchronous delivery path).
fn bench_late_subscription(c: &mut Criterion) {
    let deferred = Deferred::<u64, String>::succeeded(42);
    c.bench_function("late_subscription", |b| {
        b.iter(|| {
            deferred.subscribe_outcome(|outcome| {
                black_box(outcome.is_success());
            });
        });
    });
}

criterion_group!(
    benches,
    bench_pair_construction,
    bench_settle_with_continuations,
    bench_late_subscription
);
criterion_main!(benches);
