//! Heap configuration parameters.

use std::alloc::Layout;

use crate::error::ConfigError;
use crate::tag::{align_up, BLOCK_OVERHEAD, WORD};

/// Configuration for a [`TagHeap`](crate::TagHeap).
///
/// Validated at construction; all values are immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Total arena size in bytes, tags included.
    ///
    /// Default: 1_000_000. Must be a multiple of the machine word.
    pub arena_size: usize,

    /// Slack tolerated before a free block is split.
    ///
    /// A free block of payload `S` serving a request of `n` bytes is split
    /// only when `S > n + split_threshold`; otherwise it is handed out
    /// whole. Default: 40. Must be large enough that a split-off remainder
    /// can hold its own tags plus a minimum payload; see
    /// [`min_split_threshold`](Self::min_split_threshold).
    pub split_threshold: usize,

    /// Smallest payload ever handed out, in bytes.
    ///
    /// Default: two pointer widths, so a free block can always hold a pair
    /// of list links.
    pub min_payload: usize,
}

impl HeapConfig {
    /// Default arena size in bytes.
    pub const DEFAULT_ARENA_SIZE: usize = 1_000_000;

    /// Default split threshold in bytes.
    pub const DEFAULT_SPLIT_THRESHOLD: usize = 40;

    /// Default (and smallest accepted) minimum payload: two pointer widths.
    pub const DEFAULT_MIN_PAYLOAD: usize = 2 * WORD;

    /// Create a config for an arena of `arena_size` bytes.
    ///
    /// Uses default values for all other parameters.
    pub fn new(arena_size: usize) -> Self {
        Self {
            arena_size,
            split_threshold: Self::DEFAULT_SPLIT_THRESHOLD,
            min_payload: Self::DEFAULT_MIN_PAYLOAD,
        }
    }

    /// Replace the split threshold.
    pub fn with_split_threshold(mut self, split_threshold: usize) -> Self {
        self.split_threshold = split_threshold;
        self
    }

    /// Replace the minimum payload.
    pub fn with_min_payload(mut self, min_payload: usize) -> Self {
        self.min_payload = min_payload;
        self
    }

    /// Payload bytes of the single free block a fresh arena starts with.
    pub fn capacity(&self) -> usize {
        self.arena_size.saturating_sub(BLOCK_OVERHEAD)
    }

    /// Smallest split threshold accepted with this `min_payload`.
    ///
    /// Block sizes are word multiples, so `S > n + threshold` means the
    /// slack is at least `threshold + 1` rounded up to a word. At this
    /// floor that slack covers two tags plus a word-rounded
    /// `min_payload`, so no split leaves a free block too small to hand
    /// out. With the defaults this is exactly 40.
    pub fn min_split_threshold(&self) -> usize {
        align_up(self.min_payload)
            .and_then(|payload| payload.checked_add(BLOCK_OVERHEAD - WORD))
            .unwrap_or(usize::MAX)
    }

    /// Check that the arena can be laid out with these parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_payload < Self::DEFAULT_MIN_PAYLOAD {
            return Err(ConfigError::MinPayloadTooSmall {
                min_payload: self.min_payload,
                minimum: Self::DEFAULT_MIN_PAYLOAD,
            });
        }
        let minimum = self.min_split_threshold();
        if self.split_threshold < minimum {
            return Err(ConfigError::SplitThresholdTooSmall {
                split_threshold: self.split_threshold,
                minimum,
            });
        }
        if self.arena_size % WORD != 0 {
            return Err(ConfigError::ArenaNotWordAligned {
                arena_size: self.arena_size,
            });
        }
        if Layout::from_size_align(self.arena_size, WORD).is_err() {
            return Err(ConfigError::ArenaTooLarge {
                arena_size: self.arena_size,
            });
        }
        let minimum = align_up(self.min_payload)
            .and_then(|payload| payload.checked_add(BLOCK_OVERHEAD))
            .unwrap_or(usize::MAX);
        if self.arena_size < minimum {
            return Err(ConfigError::ArenaTooSmall {
                arena_size: self.arena_size,
                minimum,
            });
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ARENA_SIZE)
    }
}
