//! Criterion micro-benchmarks for allocate, deallocate and heap walks.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tagarena::{HeapConfig, TagHeap};
use tagarena_test_utils::fixtures::{config_for, reference_config, MIXED_SIZES};

/// Build a heap holding `blocks` live 32-byte allocations, with room left
/// for one more block of up to 64 bytes.
fn make_heap_with_blocks(blocks: usize) -> (TagHeap, Vec<tagarena::Allocation>) {
    let mut heap = TagHeap::new(config_for(blocks, 64)).unwrap();
    let live = (0..blocks).map(|_| heap.allocate(32).unwrap()).collect();
    (heap, live)
}

/// Benchmark: allocate then free one block on an empty heap.
fn bench_alloc_free_empty(c: &mut Criterion) {
    let mut heap = TagHeap::new(reference_config()).unwrap();
    c.bench_function("alloc_free_empty", |b| {
        b.iter(|| {
            let a = heap.allocate(black_box(64)).unwrap();
            heap.deallocate(a).unwrap();
        });
    });
}

/// Benchmark: first-fit scan past 1K used blocks to reach the free tail.
fn bench_alloc_past_1k_blocks(c: &mut Criterion) {
    let (mut heap, _live) = make_heap_with_blocks(1_000);
    c.bench_function("alloc_past_1k_blocks", |b| {
        b.iter(|| {
            let a = heap.allocate(black_box(64)).unwrap();
            heap.deallocate(a).unwrap();
        });
    });
}

/// Benchmark: a free that merges with both neighbours.
fn bench_free_coalesce_both(c: &mut Criterion) {
    c.bench_function("free_coalesce_both", |b| {
        b.iter_batched(
            || {
                let mut heap = TagHeap::new(HeapConfig::new(4096)).unwrap();
                let left = heap.allocate(64).unwrap();
                let middle = heap.allocate(64).unwrap();
                let right = heap.allocate(64).unwrap();
                let _fence = heap.allocate(64).unwrap();
                heap.deallocate(left).unwrap();
                heap.deallocate(right).unwrap();
                (heap, middle)
            },
            |(mut heap, middle)| {
                heap.deallocate(middle).unwrap();
                black_box(heap)
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: fill then drain a mixed-size batch.
fn bench_mixed_batch(c: &mut Criterion) {
    let mut heap = TagHeap::new(reference_config()).unwrap();
    let mut live = Vec::with_capacity(MIXED_SIZES.len() * 16);
    c.bench_function("mixed_batch_256", |b| {
        b.iter(|| {
            for _ in 0..16 {
                for &size in &MIXED_SIZES {
                    live.push(heap.allocate(size).unwrap());
                }
            }
            for a in live.drain(..) {
                heap.deallocate(a).unwrap();
            }
        });
    });
}

/// Benchmark: full-arena walks over 1K blocks.
fn bench_introspection_1k(c: &mut Criterion) {
    let (heap, _live) = make_heap_with_blocks(1_000);
    c.bench_function("used_block_count_1k", |b| {
        b.iter(|| black_box(heap.used_block_count()));
    });
    c.bench_function("check_invariants_1k", |b| {
        b.iter(|| black_box(heap.check_invariants()).unwrap());
    });
}

criterion_group!(
    benches,
    bench_alloc_free_empty,
    bench_alloc_past_1k_blocks,
    bench_free_coalesce_both,
    bench_mixed_batch,
    bench_introspection_1k
);
criterion_main!(benches);
