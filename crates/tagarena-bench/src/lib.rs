//! Benchmark workloads for the tagarena allocator.
//!
//! Provides deterministic operation streams for benchmarking and soak
//! tests:
//!
//! - [`churn_ops`]: seeded random mix of allocations and releases
//! - [`run_churn`]: replays a stream against a [`TagHeap`]

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tagarena::{Allocation, TagHeap};

/// One step of a churn workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChurnOp {
    /// Allocate this many bytes.
    Alloc(usize),
    /// Free the live allocation at this index (modulo the live count).
    Free(usize),
}

/// Totals gathered while replaying a churn workload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChurnStats {
    pub allocs: usize,
    pub frees: usize,
    pub failures: usize,
    pub peak_bytes_in_use: usize,
}

/// Build a deterministic stream of `count` operations.
///
/// Roughly 60% allocations of 1..=`max_size` bytes, 40% releases. The same
/// seed always yields the same stream.
pub fn churn_ops(seed: u64, count: usize, max_size: usize) -> Vec<ChurnOp> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let max_size = max_size.max(1) as u64;
    (0..count)
        .map(|_| {
            if rng.next_u32() % 10 < 6 {
                ChurnOp::Alloc((rng.next_u64() % max_size) as usize + 1)
            } else {
                ChurnOp::Free(rng.next_u32() as usize)
            }
        })
        .collect()
}

/// Replay `ops` against `heap`, then release whatever is still live.
///
/// Failed allocations are counted, not fatal: a full arena is part of the
/// workload.
pub fn run_churn(heap: &mut TagHeap, ops: &[ChurnOp]) -> ChurnStats {
    let mut live: Vec<Allocation> = Vec::new();
    let mut stats = ChurnStats::default();
    let mut in_use = 0usize;

    for &op in ops {
        match op {
            ChurnOp::Alloc(size) => match heap.allocate(size) {
                Ok(allocation) => {
                    in_use += allocation.size() + tagarena::BLOCK_OVERHEAD;
                    stats.peak_bytes_in_use = stats.peak_bytes_in_use.max(in_use);
                    live.push(allocation);
                    stats.allocs += 1;
                }
                Err(_) => stats.failures += 1,
            },
            ChurnOp::Free(index) => {
                if live.is_empty() {
                    continue;
                }
                let allocation = live.swap_remove(index % live.len());
                if heap.deallocate(allocation).is_ok() {
                    in_use -= allocation.size() + tagarena::BLOCK_OVERHEAD;
                    stats.frees += 1;
                }
            }
        }
    }

    for allocation in live.drain(..) {
        if heap.deallocate(allocation).is_ok() {
            stats.frees += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagarena::HeapConfig;

    #[test]
    fn same_seed_same_stream() {
        assert_eq!(churn_ops(7, 500, 256), churn_ops(7, 500, 256));
        assert_ne!(churn_ops(7, 500, 256), churn_ops(8, 500, 256));
    }

    #[test]
    fn sizes_stay_in_range() {
        for op in churn_ops(1, 1000, 64) {
            if let ChurnOp::Alloc(size) = op {
                assert!((1..=64).contains(&size));
            }
        }
    }

    #[test]
    fn churn_leaves_heap_empty() {
        let mut heap = TagHeap::new(HeapConfig::new(64 * 1024)).unwrap();
        let ops = churn_ops(42, 2000, 512);
        let stats = run_churn(&mut heap, &ops);
        assert_eq!(stats.allocs, stats.frees);
        assert_eq!(heap.used_block_count(), 0);
        assert_eq!(heap.free_block_count(), 1);
        assert!(heap.check_invariants().is_ok());
    }
}
