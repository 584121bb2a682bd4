//! Criterion benchmark: long seeded alloc/free churn on a default arena.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tagarena::TagHeap;
use tagarena_bench::{churn_ops, run_churn};
use tagarena_test_utils::fixtures::reference_config;

/// Benchmark: replay 10K seeded operations of up to 512 bytes.
fn bench_churn_10k(c: &mut Criterion) {
    let ops = churn_ops(0x5eed, 10_000, 512);
    let mut heap = TagHeap::new(reference_config()).unwrap();
    c.bench_function("churn_10k", |b| {
        b.iter(|| black_box(run_churn(&mut heap, &ops)));
    });
}

/// Benchmark: the same churn squeezed into a 64KB arena, where first-fit
/// has to walk past fragmented holes and some requests fail.
fn bench_churn_tight_arena(c: &mut Criterion) {
    let ops = churn_ops(0x5eed, 10_000, 512);
    let mut heap = TagHeap::new(tagarena::HeapConfig::new(64 * 1024)).unwrap();
    c.bench_function("churn_10k_tight", |b| {
        b.iter(|| black_box(run_churn(&mut heap, &ops)));
    });
}

criterion_group!(benches, bench_churn_10k, bench_churn_tight_arena);
criterion_main!(benches);
