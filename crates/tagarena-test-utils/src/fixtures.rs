//! Shared allocation workloads.
//!
//! - [`REFERENCE_SIZES`]: the five-block sequence used by the reference
//!   scenario tests.
//! - [`MIXED_SIZES`]: a repeating size mix for churn benchmarks.

use tagarena::{HeapConfig, BLOCK_OVERHEAD, WORD};

/// Sizes allocated, in order, at the start of the reference scenario.
pub const REFERENCE_SIZES: [usize; 5] = [5, 3, 70, 50, 8];

/// Indices into [`REFERENCE_SIZES`] released in the scenario's first free
/// step (the 70- and 50-byte blocks).
pub const REFERENCE_FREED: [usize; 2] = [2, 3];

/// Size of each of the three small allocations that refill the freed gap.
pub const REFERENCE_REFILL: usize = 3;

/// A small-to-medium size mix with a few larger outliers.
pub const MIXED_SIZES: [usize; 16] = [
    16, 24, 8, 128, 40, 64, 16, 512, 32, 8, 96, 256, 24, 48, 1024, 16,
];

/// The default 1,000,000-byte arena the reference scenario runs in.
pub fn reference_config() -> HeapConfig {
    HeapConfig::default()
}

/// A config with room for `blocks` used blocks of up to `max_payload`
/// bytes each, plus one trailing free block.
pub fn config_for(blocks: usize, max_payload: usize) -> HeapConfig {
    let payload = max_payload
        .max(HeapConfig::DEFAULT_MIN_PAYLOAD)
        .next_multiple_of(WORD);
    HeapConfig::new((blocks + 1) * (payload + BLOCK_OVERHEAD))
}
