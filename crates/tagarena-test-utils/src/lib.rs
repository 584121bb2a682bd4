//! Test utilities for tagarena development.
//!
//! Provides a [`ShadowHeap`] that drives a [`TagHeap`] while keeping an
//! independent record of every live allocation, plus layout assertions
//! and shared [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use indexmap::IndexMap;
use tagarena::{AllocError, Allocation, HeapConfig, TagHeap, BLOCK_OVERHEAD};

/// One allocation tracked by a [`ShadowHeap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveRegion {
    pub allocation: Allocation,
    /// Size the caller asked for, before clamping and rounding.
    pub requested: usize,
    /// Byte the payload was filled with when it was handed out.
    pub stamp: u8,
}

/// A [`TagHeap`] paired with a model of what should be live in it.
///
/// Every payload is filled with a per-allocation stamp byte. If the heap
/// ever hands out overlapping regions, or a tag write lands inside a live
/// payload, the stamps stop matching and [`assert_consistent`] fails.
///
/// [`assert_consistent`]: ShadowHeap::assert_consistent
pub struct ShadowHeap {
    heap: TagHeap,
    /// Live regions keyed by payload offset, in allocation order.
    live: IndexMap<usize, LiveRegion>,
    last_stamp: u8,
}

impl ShadowHeap {
    pub fn new(config: HeapConfig) -> Self {
        Self {
            heap: TagHeap::new(config).expect("test config must be valid"),
            live: IndexMap::new(),
            last_stamp: 0,
        }
    }

    pub fn heap(&self) -> &TagHeap {
        &self.heap
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live regions in allocation order.
    pub fn live(&self) -> impl Iterator<Item = &LiveRegion> {
        self.live.values()
    }

    fn next_stamp(&mut self) -> u8 {
        self.last_stamp = self.last_stamp.wrapping_add(1).max(1);
        self.last_stamp
    }

    /// Allocate through the heap and record the result.
    pub fn allocate(&mut self, size: usize) -> Result<Allocation, AllocError> {
        let allocation = self.heap.allocate(size)?;
        assert!(
            allocation.size() >= size,
            "{allocation} is smaller than the {size} bytes requested"
        );
        let stamp = self.next_stamp();
        self.heap
            .payload_mut(allocation)
            .expect("fresh allocation must be live")
            .fill(stamp);
        let previous = self.live.insert(
            allocation.offset(),
            LiveRegion {
                allocation,
                requested: size,
                stamp,
            },
        );
        assert!(
            previous.is_none(),
            "heap handed out live offset {} twice",
            allocation.offset()
        );
        Ok(allocation)
    }

    /// Free the live region at `index % live_count()`. `None` if nothing is
    /// live.
    pub fn free_nth(&mut self, index: usize) -> Option<Allocation> {
        if self.live.is_empty() {
            return None;
        }
        let (_, region) = self.live.swap_remove_index(index % self.live.len())?;
        self.release(region);
        Some(region.allocation)
    }

    /// Free a specific allocation that the model knows to be live.
    pub fn free(&mut self, allocation: Allocation) {
        let region = self
            .live
            .shift_remove(&allocation.offset())
            .unwrap_or_else(|| panic!("{allocation} is not live in the model"));
        self.release(region);
    }

    /// Free everything still live, oldest first.
    pub fn free_all(&mut self) {
        let regions: Vec<LiveRegion> = self.live.drain(..).map(|(_, r)| r).collect();
        for region in regions {
            self.release(region);
        }
    }

    fn release(&mut self, region: LiveRegion) {
        self.verify_stamp(&region);
        if let Err(err) = self.heap.deallocate(region.allocation) {
            panic!("live {} rejected: {err}\n{}", region.allocation, self.heap);
        }
    }

    fn verify_stamp(&self, region: &LiveRegion) {
        let bytes = self
            .heap
            .payload(region.allocation)
            .unwrap_or_else(|err| panic!("live {} unreadable: {err}", region.allocation));
        assert!(
            bytes.iter().all(|&b| b == region.stamp),
            "payload of {} was overwritten",
            region.allocation
        );
    }

    /// Check the heap's structure against the model.
    pub fn assert_consistent(&self) {
        if let Err(err) = self.heap.check_invariants() {
            panic!("{err}\n{}", self.heap);
        }
        assert_conservation(&self.heap);
        assert_no_adjacent_free(&self.heap);
        assert_eq!(self.heap.used_block_count(), self.live.len());

        let mut regions: Vec<&LiveRegion> = self.live.values().collect();
        regions.sort_by_key(|r| r.allocation.offset());
        for pair in regions.windows(2) {
            let (a, b) = (pair[0].allocation, pair[1].allocation);
            assert!(
                a.offset() + a.size() + BLOCK_OVERHEAD <= b.offset(),
                "{a} overlaps {b}"
            );
        }
        for region in regions {
            assert!(
                region.allocation.size() >= region.requested,
                "{} is smaller than the {} bytes requested",
                region.allocation,
                region.requested
            );
            self.verify_stamp(region);
        }
    }
}

/// Used bytes, free payload and free-block tag overhead add up to the arena.
pub fn assert_conservation(heap: &TagHeap) {
    let free_overhead = heap.free_block_count() * BLOCK_OVERHEAD;
    assert_eq!(
        heap.bytes_in_use() + free_overhead + heap.free_bytes(),
        heap.arena_size(),
        "space not conserved\n{heap}"
    );
}

/// No two consecutive blocks are both free.
pub fn assert_no_adjacent_free(heap: &TagHeap) {
    let blocks: Vec<_> = heap.blocks().collect();
    for pair in blocks.windows(2) {
        assert!(
            !(pair[0].is_free && pair[1].is_free),
            "free blocks at {} and {} are adjacent\n{heap}",
            pair[0].offset,
            pair[1].offset
        );
    }
}
