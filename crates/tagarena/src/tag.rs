//! Boundary tags and word arithmetic.
//!
//! Every block is framed by two identical tags. A tag is two machine words:
//! the payload size in bytes, then a state marker. Only the two marker
//! values below are valid, so a stray data word is unlikely to pass for a
//! tag when a bogus offset is handed back to the heap.

use std::mem;

/// Size of a machine word in bytes. All tag and payload offsets are
/// multiples of this.
pub const WORD: usize = mem::size_of::<usize>();

/// Size of one boundary tag in bytes (size word + state word).
pub const TAG_SIZE: usize = 2 * WORD;

/// Tag overhead carried by every block (leading + trailing tag).
pub const BLOCK_OVERHEAD: usize = 2 * TAG_SIZE;

const STATE_FREE: usize = 0x4652_4545;
const STATE_USED: usize = 0x5553_4544;

/// Round `value` up to the next multiple of [`WORD`].
///
/// Returns `None` if the rounded value does not fit in `usize`.
pub(crate) fn align_up(value: usize) -> Option<usize> {
    value
        .checked_add(WORD - 1)
        .map(|v| v & !(WORD - 1))
}

/// Decoded contents of a boundary tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Tag {
    /// Payload bytes of the block this tag frames.
    pub size: usize,
    /// Whether the block is free.
    pub is_free: bool,
}

impl Tag {
    pub fn free(size: usize) -> Self {
        Self {
            size,
            is_free: true,
        }
    }

    pub fn used(size: usize) -> Self {
        Self {
            size,
            is_free: false,
        }
    }

    /// The state word stored after the size word.
    pub fn state_word(self) -> usize {
        if self.is_free {
            STATE_FREE
        } else {
            STATE_USED
        }
    }

    /// Rebuild a tag from its two words. `None` for an unknown state marker.
    pub fn decode(size: usize, state: usize) -> Option<Self> {
        match state {
            STATE_FREE => Some(Self::free(size)),
            STATE_USED => Some(Self::used(size)),
            _ => None,
        }
    }

    /// Bytes from this block's leading tag to the next block's leading tag.
    pub fn span(self) -> Option<usize> {
        self.size.checked_add(BLOCK_OVERHEAD)
    }
}
