//! Read-only walks over the tag chain.
//!
//! Everything here is diagnostic: counts, byte totals, a layout dump and a
//! full consistency check. Each walk is O(number of blocks).

use std::fmt;
use std::iter::FusedIterator;

use crate::error::HeapError;
use crate::heap::TagHeap;
use crate::tag::{Tag, BLOCK_OVERHEAD, TAG_SIZE, WORD};

/// One block as seen by a walk over the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block's leading tag.
    pub offset: usize,
    /// Payload bytes, excluding both tags.
    pub size: usize,
    /// Whether the block is free.
    pub is_free: bool,
}

impl BlockInfo {
    pub(crate) fn new(offset: usize, tag: Tag) -> Self {
        Self {
            offset,
            size: tag.size,
            is_free: tag.is_free,
        }
    }

    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> usize {
        self.offset + TAG_SIZE
    }

    /// Bytes occupied in the arena, both tags included.
    pub fn span(&self) -> usize {
        self.size + BLOCK_OVERHEAD
    }
}

/// Iterator over the blocks of a [`TagHeap`] in address order.
///
/// Follows leading tags only. Stops early, without panicking, at a tag it
/// cannot decode or one that would run past the end of the arena.
pub struct Blocks<'a> {
    heap: &'a TagHeap,
    offset: usize,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        let end = self.heap.arena_size();
        if self.offset >= end {
            return None;
        }
        let offset = self.offset;
        let next = self
            .heap
            .read_tag(offset)
            .and_then(|tag| Some((tag, offset.checked_add(tag.span()?)?)))
            .filter(|&(_, next)| next <= end);
        match next {
            Some((tag, next)) => {
                let info = BlockInfo::new(offset, tag);
                self.offset = next;
                Some(info)
            }
            None => {
                self.offset = end;
                None
            }
        }
    }
}

impl FusedIterator for Blocks<'_> {}

impl TagHeap {
    /// Walk the arena from offset 0, yielding each block.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            heap: self,
            offset: 0,
        }
    }

    /// Number of free blocks.
    pub fn free_block_count(&self) -> usize {
        self.blocks().filter(|b| b.is_free).count()
    }

    /// Number of blocks currently handed out.
    pub fn used_block_count(&self) -> usize {
        self.blocks().filter(|b| !b.is_free).count()
    }

    /// Arena bytes taken by used blocks, their tags included.
    pub fn bytes_in_use(&self) -> usize {
        self.blocks()
            .filter(|b| !b.is_free)
            .map(|b| b.span())
            .sum()
    }

    /// Payload bytes across all free blocks (tags excluded).
    pub fn free_bytes(&self) -> usize {
        self.blocks()
            .filter(|b| b.is_free)
            .map(|b| b.size)
            .sum()
    }

    /// Payload size of the largest free block, `None` if nothing is free.
    pub fn largest_free_block(&self) -> Option<usize> {
        self.blocks().filter(|b| b.is_free).map(|b| b.size).max()
    }

    /// Walk the whole arena and verify its structure.
    ///
    /// Checks that blocks tile the arena exactly, that each leading tag
    /// matches its trailing tag, that no two neighbours are both free, and
    /// that every block, free or used, meets the minimum payload.
    pub fn check_invariants(&self) -> Result<(), HeapError> {
        let end = self.arena_size();
        let corrupted = |offset, reason| HeapError::Corrupted { offset, reason };
        let mut offset = 0;
        let mut prev_free = false;
        let mut accounted = 0usize;

        while offset < end {
            let lead = self
                .read_tag(offset)
                .ok_or_else(|| corrupted(offset, "unreadable leading tag"))?;
            if lead.size % WORD != 0 {
                return Err(corrupted(offset, "payload size is not word-aligned"));
            }
            let next = lead
                .span()
                .and_then(|span| offset.checked_add(span))
                .filter(|&next| next <= end)
                .ok_or_else(|| corrupted(offset, "block runs past the arena end"))?;
            let trail = self.read_tag(next - TAG_SIZE);
            if trail != Some(lead) {
                return Err(corrupted(offset, "leading and trailing tags disagree"));
            }
            if lead.is_free && prev_free {
                return Err(corrupted(offset, "adjacent free blocks"));
            }
            if lead.size < self.config().min_payload {
                return Err(corrupted(offset, "block below minimum payload"));
            }
            accounted += lead.size + BLOCK_OVERHEAD;
            prev_free = lead.is_free;
            offset = next;
        }

        if accounted != end {
            return Err(corrupted(offset, "blocks do not account for the whole arena"));
        }
        Ok(())
    }
}

impl fmt::Display for TagHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TagHeap(arena={}, used={}, free={})",
            self.arena_size(),
            self.used_block_count(),
            self.free_block_count()
        )?;
        for block in self.blocks() {
            let state = if block.is_free { "free" } else { "used" };
            writeln!(f, "  [{:>10}] {state} {}", block.offset, block.size)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TagHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagHeap")
            .field("config", self.config())
            .field("used_blocks", &self.used_block_count())
            .field("free_blocks", &self.free_block_count())
            .field("bytes_in_use", &self.bytes_in_use())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeapConfig;

    #[test]
    fn counts_on_fresh_heap() {
        let heap = TagHeap::new(HeapConfig::new(1024)).unwrap();
        assert_eq!(heap.free_block_count(), 1);
        assert_eq!(heap.used_block_count(), 0);
        assert_eq!(heap.bytes_in_use(), 0);
        assert_eq!(heap.free_bytes(), heap.capacity());
        assert_eq!(heap.largest_free_block(), Some(heap.capacity()));
    }

    #[test]
    fn bytes_in_use_counts_tags() {
        let mut heap = TagHeap::new(HeapConfig::new(1024)).unwrap();
        let _ = heap.allocate(64).unwrap();
        let _ = heap.allocate(32).unwrap();
        assert_eq!(heap.bytes_in_use(), 64 + 32 + 2 * BLOCK_OVERHEAD);
        assert_eq!(heap.used_block_count(), 2);
    }

    #[test]
    fn blocks_tile_the_arena() {
        let mut heap = TagHeap::new(HeapConfig::new(2048)).unwrap();
        for size in [24, 80, 8, 200] {
            let _ = heap.allocate(size).unwrap();
        }
        let total: usize = heap.blocks().map(|b| b.span()).sum();
        assert_eq!(total, heap.arena_size());
        let mut expected = 0;
        for block in heap.blocks() {
            assert_eq!(block.offset, expected);
            expected += block.span();
        }
    }

    #[test]
    fn largest_free_block_none_when_full() {
        let mut heap = TagHeap::new(HeapConfig::new(256)).unwrap();
        let _ = heap.allocate(heap.capacity()).unwrap();
        assert_eq!(heap.largest_free_block(), None);
        assert_eq!(heap.free_bytes(), 0);
    }

    #[test]
    fn check_invariants_passes_on_valid_heap() {
        let mut heap = TagHeap::new(HeapConfig::new(1024)).unwrap();
        let a = heap.allocate(16).unwrap();
        let _b = heap.allocate(100).unwrap();
        heap.deallocate(a).unwrap();
        assert_eq!(heap.check_invariants(), Ok(()));
    }

    #[test]
    fn check_invariants_detects_scribbled_trailer() {
        let mut heap = TagHeap::new(HeapConfig::new(1024)).unwrap();
        let a = heap.allocate(32).unwrap();
        let _b = heap.allocate(32).unwrap();
        // Overrun the first payload by one word into its trailing tag.
        heap.scribble_for_tests(a.offset() + a.size(), 7);
        assert_eq!(
            heap.check_invariants(),
            Err(HeapError::Corrupted {
                offset: 0,
                reason: "leading and trailing tags disagree",
            })
        );
    }

    #[test]
    fn check_invariants_detects_adjacent_free_blocks() {
        let mut heap = TagHeap::new(HeapConfig::new(1024)).unwrap();
        let a = heap.allocate(32).unwrap();
        let _b = heap.allocate(32).unwrap();
        heap.deallocate(a).unwrap();
        // Flip the used neighbour to free behind the heap's back.
        let b_lead = a.offset() + a.size() + TAG_SIZE;
        let free_state = Tag::free(0).state_word();
        heap.scribble_for_tests(b_lead + WORD, free_state);
        heap.scribble_for_tests(b_lead + TAG_SIZE + 32 + WORD, free_state);
        assert_eq!(
            heap.check_invariants(),
            Err(HeapError::Corrupted {
                offset: b_lead,
                reason: "adjacent free blocks",
            })
        );
    }

    #[test]
    fn blocks_stop_at_corrupt_tag() {
        let mut heap = TagHeap::new(HeapConfig::new(1024)).unwrap();
        let a = heap.allocate(32).unwrap();
        let next_lead = a.offset() + a.size() + TAG_SIZE;
        heap.scribble_for_tests(next_lead + WORD, 0);
        assert_eq!(heap.blocks().count(), 1);
        assert!(heap.check_invariants().is_err());
    }

    #[test]
    fn display_lists_every_block() {
        let mut heap = TagHeap::new(HeapConfig::new(1024)).unwrap();
        let _ = heap.allocate(64).unwrap();
        let dump = heap.to_string();
        assert!(dump.starts_with("TagHeap(arena=1024, used=1, free=1)"));
        assert_eq!(dump.lines().count(), 3);
        assert!(dump.contains("used 64"));
    }
}
