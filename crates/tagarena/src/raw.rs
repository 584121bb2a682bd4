//! Owned, word-aligned backing storage for the arena.
//!
//! This is the only module besides `adapter` that contains `unsafe` code.
//! All accesses are bounds-checked before the raw pointer is touched, and
//! every derived pointer comes from the allocation's own base pointer so
//! that pointers handed out to callers stay valid across later tag writes.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::tag::WORD;

/// A fixed-length, zero-initialised byte buffer aligned to one machine word.
///
/// Allocated once at construction and released exactly once on drop.
/// Never resized.
pub(crate) struct RawArena {
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: `RawArena` uniquely owns its allocation; moving it to another
// thread moves that ownership with it.
unsafe impl Send for RawArena {}

impl RawArena {
    /// Allocate a zeroed arena of `len` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero, not a multiple of [`WORD`], or larger than
    /// `isize::MAX`. All three are ruled out by config validation before
    /// this is called.
    pub fn new(len: usize) -> Self {
        assert!(len > 0 && len % WORD == 0, "arena length {len} not word-sized");
        let layout = Self::layout(len);
        // SAFETY: `layout` has a non-zero size (asserted above).
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let Some(base) = NonNull::new(ptr) else {
            alloc::handle_alloc_error(layout);
        };
        Self { base, len }
    }

    fn layout(len: usize) -> Layout {
        match Layout::from_size_align(len, WORD) {
            Ok(layout) => layout,
            Err(_) => panic!("arena length {len} overflows isize"),
        }
    }

    /// Arena length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    fn in_bounds(&self, offset: usize, len: usize) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.len)
    }

    /// Read the word at `offset`. `None` if out of range or misaligned.
    pub fn read_word(&self, offset: usize) -> Option<usize> {
        if offset % WORD != 0 || !self.in_bounds(offset, WORD) {
            return None;
        }
        // SAFETY: `offset + WORD <= len` and `offset` is word-aligned within
        // a word-aligned allocation, so the read is in bounds and aligned.
        Some(unsafe { self.base.as_ptr().add(offset).cast::<usize>().read() })
    }

    /// Write `value` to the word at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the word is out of range or misaligned.
    pub fn write_word(&mut self, offset: usize, value: usize) {
        assert!(
            offset % WORD == 0 && self.in_bounds(offset, WORD),
            "word write at {offset} outside arena of {} bytes",
            self.len
        );
        // SAFETY: bounds and alignment checked above; `&mut self` gives
        // exclusive access to the tag words.
        unsafe { self.base.as_ptr().add(offset).cast::<usize>().write(value) }
    }

    /// Shared view of `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the arena.
    pub fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        assert!(self.in_bounds(offset, len), "range {offset}+{len} outside arena");
        // SAFETY: range checked above; the buffer is initialised (zeroed at
        // construction) and lives as long as `self`.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr().add(offset), len) }
    }

    /// Mutable view of `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the arena.
    pub fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        assert!(self.in_bounds(offset, len), "range {offset}+{len} outside arena");
        // SAFETY: as in `bytes`, plus `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr().add(offset), len) }
    }

    /// Raw pointer to the byte at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not inside the arena.
    pub fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        assert!(offset < self.len, "offset {offset} outside arena");
        // SAFETY: `offset < len`, so the result stays inside the allocation
        // and is therefore non-null.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
    }

    /// Offset of `ptr` from the arena base, if it points inside the arena.
    pub fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = (ptr.as_ptr() as usize).checked_sub(self.base.as_ptr() as usize)?;
        (offset < self.len).then_some(offset)
    }
}

impl Drop for RawArena {
    fn drop(&mut self) {
        // SAFETY: `base` was returned by `alloc_zeroed` with this exact
        // layout and is released only here.
        unsafe { alloc::dealloc(self.base.as_ptr(), Self::layout(self.len)) }
    }
}
