//! Error types for heap construction, allocation and consistency checks.

use std::error::Error;
use std::fmt;

/// Errors returned by the allocation path.
///
/// `OutOfMemory` is the only recoverable runtime condition. The remaining
/// variants report contract violations by the caller; they are detected
/// before any tag is written, so the arena is left untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// No free block is large enough for the request.
    OutOfMemory {
        /// Number of payload bytes the caller asked for.
        requested: usize,
        /// Largest free payload currently available (0 if none).
        largest_free: usize,
    },
    /// The offset does not name the payload of a block in this arena.
    InvalidPointer {
        /// The rejected payload offset.
        offset: usize,
    },
    /// The block at this offset is already free.
    DoubleFree {
        /// The payload offset that was released twice.
        offset: usize,
    },
    /// `count * size_of::<T>()` does not fit in `usize`.
    ElementOverflow {
        /// Number of elements requested.
        count: usize,
        /// Size of one element in bytes.
        elem_size: usize,
    },
    /// The element type needs stricter alignment than one machine word.
    UnsupportedAlignment {
        /// Alignment required by the element type.
        align: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} bytes, largest free block {largest_free} bytes"
                )
            }
            Self::InvalidPointer { offset } => {
                write!(f, "offset {offset} is not a live allocation")
            }
            Self::DoubleFree { offset } => {
                write!(f, "double free of allocation at offset {offset}")
            }
            Self::ElementOverflow { count, elem_size } => {
                write!(
                    f,
                    "{count} elements of {elem_size} bytes overflow the address space"
                )
            }
            Self::UnsupportedAlignment { align } => {
                write!(f, "alignment {align} exceeds the arena's word alignment")
            }
        }
    }
}

impl Error for AllocError {}

/// Errors from validating a [`HeapConfig`](crate::HeapConfig).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The arena cannot hold even one minimum-sized block.
    ArenaTooSmall {
        /// Configured arena size in bytes.
        arena_size: usize,
        /// Smallest arena size accepted for this configuration.
        minimum: usize,
    },
    /// The arena is larger than a single allocation may be (`isize::MAX`).
    ArenaTooLarge {
        /// Configured arena size in bytes.
        arena_size: usize,
    },
    /// The arena size is not a multiple of the machine word.
    ArenaNotWordAligned {
        /// Configured arena size in bytes.
        arena_size: usize,
    },
    /// The minimum payload is smaller than two pointer widths.
    MinPayloadTooSmall {
        /// Configured minimum payload in bytes.
        min_payload: usize,
        /// Smallest accepted minimum payload.
        minimum: usize,
    },
    /// The split threshold could leave a remainder too small to allocate.
    SplitThresholdTooSmall {
        /// Configured split threshold in bytes.
        split_threshold: usize,
        /// Smallest accepted threshold.
        minimum: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArenaTooSmall {
                arena_size,
                minimum,
            } => {
                write!(
                    f,
                    "arena of {arena_size} bytes is too small, need at least {minimum}"
                )
            }
            Self::ArenaTooLarge { arena_size } => {
                write!(f, "arena of {arena_size} bytes exceeds the largest possible allocation")
            }
            Self::ArenaNotWordAligned { arena_size } => {
                write!(f, "arena size {arena_size} is not a multiple of the word size")
            }
            Self::MinPayloadTooSmall {
                min_payload,
                minimum,
            } => {
                write!(
                    f,
                    "minimum payload {min_payload} is below the floor of {minimum} bytes"
                )
            }
            Self::SplitThresholdTooSmall {
                split_threshold,
                minimum,
            } => {
                write!(
                    f,
                    "split threshold {split_threshold} is below the floor of {minimum} bytes"
                )
            }
        }
    }
}

impl Error for ConfigError {}

/// A structural violation found by [`TagHeap::check_invariants`](crate::TagHeap::check_invariants).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// The tag walk hit an inconsistent block.
    Corrupted {
        /// Offset of the leading tag of the offending block.
        offset: usize,
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted { offset, reason } => {
                write!(f, "heap corrupted at offset {offset}: {reason}")
            }
        }
    }
}

impl Error for HeapError {}
