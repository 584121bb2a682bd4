//! The boundary-tag heap: first-fit placement, splitting and coalescing.
//!
//! Blocks are laid out back to back from offset 0 to the end of the arena:
//!
//! ```text
//! | lead | payload ........ | trail | lead | payload .. | trail | ...
//!   ^ block offset   ^ payload offset = block offset + TAG_SIZE
//! ```
//!
//! The leading tag lets a walk skip forward to the next block; the
//! trailing tag lets a freed block find the start of its left neighbour,
//! so both merges on release are O(1). Placement is a linear first-fit
//! scan over the tag chain.

use std::num::NonZeroUsize;
use std::ptr::NonNull;

use log::{debug, trace, warn};

use crate::config::HeapConfig;
use crate::error::{AllocError, ConfigError};
use crate::handle::Allocation;
use crate::inspect::BlockInfo;
use crate::raw::RawArena;
use crate::tag::{align_up, Tag, BLOCK_OVERHEAD, TAG_SIZE, WORD};

const LEADING_TAG: NonZeroUsize = match NonZeroUsize::new(TAG_SIZE) {
    Some(size) => size,
    None => panic!("boundary tags are at least one word"),
};

/// A fixed-size arena managed with boundary tags.
///
/// All bookkeeping lives inside the arena itself. Every mutating operation
/// takes `&mut self`; wrap the heap in a `Mutex` to share it.
pub struct TagHeap {
    arena: RawArena,
    config: HeapConfig,
}

impl TagHeap {
    /// Create a heap whose arena is one free block spanning the whole
    /// region.
    pub fn new(config: HeapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut heap = Self {
            arena: RawArena::new(config.arena_size),
            config,
        };
        heap.format();
        debug!(
            "created tag heap: {} byte arena, {} bytes usable",
            heap.arena_size(),
            heap.capacity()
        );
        Ok(heap)
    }

    /// A new, empty heap with this heap's already-validated configuration.
    pub(crate) fn empty_like(&self) -> Self {
        let mut heap = Self {
            arena: RawArena::new(self.arena_size()),
            config: self.config.clone(),
        };
        heap.format();
        heap
    }

    /// Return the arena to a single free block.
    ///
    /// Every outstanding [`Allocation`] becomes invalid. The arena is
    /// zeroed first so that no tag from before the reset survives: handing
    /// an old handle back afterwards is rejected rather than accepted as
    /// live.
    pub fn reset(&mut self) {
        let len = self.arena_size();
        self.arena.bytes_mut(0, len).fill(0);
        self.format();
        debug!("reset tag heap to one free block of {} bytes", self.capacity());
    }

    fn format(&mut self) {
        let capacity = self.capacity();
        self.write_block(0, Tag::free(capacity));
    }

    /// The configuration this heap was built with.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Arena size in bytes, tags included.
    pub fn arena_size(&self) -> usize {
        self.arena.len()
    }

    /// Payload bytes of a fully coalesced arena.
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    pub(crate) fn read_tag(&self, offset: usize) -> Option<Tag> {
        let size = self.arena.read_word(offset)?;
        let state = self.arena.read_word(offset.checked_add(WORD)?)?;
        Tag::decode(size, state)
    }

    fn write_tag(&mut self, offset: usize, tag: Tag) {
        self.arena.write_word(offset, tag.size);
        self.arena.write_word(offset + WORD, tag.state_word());
    }

    /// Write matching leading and trailing tags for the block at `start`.
    fn write_block(&mut self, start: usize, tag: Tag) {
        self.write_tag(start, tag);
        self.write_tag(start + TAG_SIZE + tag.size, tag);
    }

    /// Payload offset of the block whose leading tag is at `start`.
    fn payload_offset(start: usize) -> NonZeroUsize {
        // Never zero: the payload always sits past a non-empty leading tag.
        LEADING_TAG.saturating_add(start)
    }

    /// Effective payload size for a request: clamped to the minimum, then
    /// rounded up to a whole word.
    fn request_size(&self, size: usize) -> Option<usize> {
        align_up(size.max(self.config.min_payload))
    }

    /// Reserve at least `size` bytes.
    ///
    /// Takes the first free block (in address order) that is large enough.
    /// The block is split when it exceeds the request by more than the
    /// split threshold, otherwise it is handed out whole. On
    /// [`AllocError::OutOfMemory`] no tag has been touched.
    pub fn allocate(&mut self, size: usize) -> Result<Allocation, AllocError> {
        let Some(needed) = self.request_size(size) else {
            return Err(self.out_of_memory(size));
        };
        let Some(block) = self.blocks().find(|b| b.is_free && b.size >= needed) else {
            return Err(self.out_of_memory(size));
        };

        let start = block.offset;
        let recorded = if block.size > needed.saturating_add(self.config.split_threshold) {
            let remainder = block.size - needed - BLOCK_OVERHEAD;
            self.write_block(start, Tag::used(needed));
            self.write_block(start + needed + BLOCK_OVERHEAD, Tag::free(remainder));
            trace!("split block at {start}: {needed} used, {remainder} left free");
            needed
        } else {
            self.write_block(start, Tag::used(block.size));
            trace!(
                "took block at {start} whole: {} bytes for a {needed} byte request",
                block.size
            );
            block.size
        };

        Ok(Allocation::new(Self::payload_offset(start), recorded))
    }

    /// Like [`allocate`](Self::allocate), with the payload zero-filled.
    pub fn allocate_zeroed(&mut self, size: usize) -> Result<Allocation, AllocError> {
        let allocation = self.allocate(size)?;
        self.arena
            .bytes_mut(allocation.offset(), allocation.size())
            .fill(0);
        Ok(allocation)
    }

    fn out_of_memory(&self, requested: usize) -> AllocError {
        let largest_free = self.largest_free_block().unwrap_or(0);
        debug!("allocation of {requested} bytes failed, largest free block {largest_free}");
        AllocError::OutOfMemory {
            requested,
            largest_free,
        }
    }

    /// Release a region and merge it with any free neighbours.
    ///
    /// The handle is checked against the tags first: a handle whose block
    /// is already free yields [`AllocError::DoubleFree`], one that does not
    /// frame a block yields [`AllocError::InvalidPointer`], and in both
    /// cases the arena is left untouched.
    ///
    /// Stale handles are caught as long as their old tags are still free
    /// or gone: a handle into a region that has since been coalesced
    /// reports `DoubleFree`, and any handle issued before a
    /// [`reset`](Self::reset) reports `InvalidPointer`. A stale handle
    /// whose offset has been reused as the start of a new live block
    /// cannot be told apart from that block's own handle.
    pub fn deallocate(&mut self, allocation: Allocation) -> Result<(), AllocError> {
        self.release(allocation.offset())
    }

    pub(crate) fn release(&mut self, offset: usize) -> Result<(), AllocError> {
        let (mut start, tag) = match self.live_block(offset) {
            Ok(block) => block,
            Err(err) => {
                warn!("rejected deallocation: {err}");
                return Err(err);
            }
        };
        self.write_block(start, Tag::free(tag.size));
        let mut size = tag.size;

        if let Some(left) = self.free_block_before(start) {
            size += left.size + BLOCK_OVERHEAD;
            start = left.offset;
            self.write_block(start, Tag::free(size));
            trace!("coalesced left into block at {start}, now {size} bytes");
        }

        if let Some(right) = self.free_block_after(start, size) {
            size += right.size + BLOCK_OVERHEAD;
            self.write_block(start, Tag::free(size));
            trace!("coalesced right into block at {start}, now {size} bytes");
        }

        Ok(())
    }

    /// The free block whose trailing tag ends right before `start`.
    fn free_block_before(&self, start: usize) -> Option<BlockInfo> {
        let trailer = start.checked_sub(TAG_SIZE)?;
        let tag = self.read_tag(trailer)?;
        if !tag.is_free {
            return None;
        }
        let left = trailer.checked_sub(tag.size)?.checked_sub(TAG_SIZE)?;
        (self.read_tag(left)? == tag).then_some(BlockInfo::new(left, tag))
    }

    /// The free block that starts right after the block at `start`.
    fn free_block_after(&self, start: usize, size: usize) -> Option<BlockInfo> {
        let next = start + size + BLOCK_OVERHEAD;
        if next >= self.arena_size() {
            return None;
        }
        let tag = self.read_tag(next)?;
        if !tag.is_free {
            return None;
        }
        let trailer = next.checked_add(TAG_SIZE)?.checked_add(tag.size)?;
        (self.read_tag(trailer)? == tag).then_some(BlockInfo::new(next, tag))
    }

    /// Validate a payload offset and return its block's start and tag.
    fn live_block(&self, offset: usize) -> Result<(usize, Tag), AllocError> {
        let invalid = || AllocError::InvalidPointer { offset };
        if offset % WORD != 0 || offset < TAG_SIZE || offset > self.arena_size() - TAG_SIZE {
            return Err(invalid());
        }
        let start = offset - TAG_SIZE;
        let lead = self.read_tag(start).ok_or_else(invalid)?;
        if lead.is_free {
            return Err(AllocError::DoubleFree { offset });
        }
        let trailer = offset.checked_add(lead.size).ok_or_else(invalid)?;
        match self.read_tag(trailer) {
            Some(trail) if trail == lead => Ok((start, lead)),
            _ => Err(invalid()),
        }
    }

    /// Re-derive a handle for the live block whose payload starts at
    /// `offset`.
    pub(crate) fn allocation_at(&self, offset: usize) -> Result<Allocation, AllocError> {
        let (start, tag) = self.live_block(offset)?;
        Ok(Allocation::new(Self::payload_offset(start), tag.size))
    }

    /// Read access to a live region's payload.
    pub fn payload(&self, allocation: Allocation) -> Result<&[u8], AllocError> {
        let (start, tag) = self.live_block(allocation.offset())?;
        Ok(self.arena.bytes(start + TAG_SIZE, tag.size))
    }

    /// Write access to a live region's payload.
    pub fn payload_mut(&mut self, allocation: Allocation) -> Result<&mut [u8], AllocError> {
        let (start, tag) = self.live_block(allocation.offset())?;
        Ok(self.arena.bytes_mut(start + TAG_SIZE, tag.size))
    }

    pub(crate) fn payload_ptr(&self, allocation: Allocation) -> NonNull<u8> {
        self.arena.ptr_at(allocation.offset())
    }

    pub(crate) fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.arena.offset_of(ptr)
    }

    /// Overwrite one arena word, bypassing the tag logic.
    #[cfg(test)]
    pub(crate) fn scribble_for_tests(&mut self, offset: usize, value: usize) {
        self.arena.write_word(offset, value);
    }
}

impl Default for TagHeap {
    fn default() -> Self {
        Self::new(HeapConfig::default()).expect("default heap config is valid")
    }
}
