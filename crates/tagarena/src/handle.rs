//! Allocation handles.
//!
//! An [`Allocation`] names a region handed out by
//! [`TagHeap::allocate`](crate::TagHeap::allocate) by its payload offset
//! into the arena. Payload offsets always sit past a leading tag, so they
//! are never zero and `Option<Allocation>` costs nothing extra.

use std::fmt;
use std::num::NonZeroUsize;

/// A live region within a [`TagHeap`](crate::TagHeap).
///
/// Handles are plain values: copying one does not duplicate the region, and
/// the heap re-validates the handle against its tags on every use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Allocation {
    /// Byte offset of the first payload byte.
    offset: NonZeroUsize,
    /// Payload bytes recorded in the block's tags at allocation time.
    size: usize,
}

impl Allocation {
    pub(crate) fn new(offset: NonZeroUsize, size: usize) -> Self {
        Self { offset, size }
    }

    /// Byte offset of the payload from the start of the arena.
    pub fn offset(&self) -> usize {
        self.offset.get()
    }

    /// Usable payload bytes. At least the requested size.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Allocation(off={}, size={})", self.offset, self.size)
    }
}
