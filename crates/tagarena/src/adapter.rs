//! Typed container adapter over a private [`TagHeap`].
//!
//! [`ArenaAdapter<T>`] speaks in elements rather than bytes and hands out
//! raw pointers, which is the shape generic containers expect from an
//! allocator. Each adapter owns its own arena. Adapters still compare equal
//! to one another regardless of element type: from a container's point of
//! view they are interchangeable, stateless allocators.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::config::HeapConfig;
use crate::error::{AllocError, ConfigError};
use crate::heap::TagHeap;
use crate::tag::WORD;

/// Element-typed allocator backed by a privately owned [`TagHeap`].
pub struct ArenaAdapter<T> {
    heap: TagHeap,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArenaAdapter<T> {
    /// Create an adapter with its own arena built from `config`.
    pub fn new(config: HeapConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            heap: TagHeap::new(config)?,
            _marker: PhantomData,
        })
    }

    /// The underlying heap, for introspection.
    pub fn heap(&self) -> &TagHeap {
        &self.heap
    }

    /// Reserve uninitialised storage for `count` elements.
    ///
    /// The returned pointer is word-aligned and valid for
    /// `count * size_of::<T>()` bytes until passed to
    /// [`deallocate`](Self::deallocate) or the adapter is dropped.
    pub fn allocate(&mut self, count: usize) -> Result<NonNull<T>, AllocError> {
        let align = mem::align_of::<T>();
        if align > WORD {
            return Err(AllocError::UnsupportedAlignment { align });
        }
        let elem_size = mem::size_of::<T>();
        let bytes = count
            .checked_mul(elem_size)
            .ok_or(AllocError::ElementOverflow { count, elem_size })?;
        let allocation = self.heap.allocate(bytes)?;
        Ok(self.heap.payload_ptr(allocation).cast())
    }

    /// Release storage obtained from [`allocate`](Self::allocate).
    ///
    /// `count` is accepted for interface compatibility; the block's tags
    /// already record its size.
    pub fn deallocate(&mut self, ptr: NonNull<T>, count: usize) -> Result<(), AllocError> {
        let _ = count;
        let ptr = ptr.cast::<u8>();
        let offset = self
            .heap
            .offset_of(ptr)
            .ok_or(AllocError::InvalidPointer {
                offset: ptr.as_ptr() as usize,
            })?;
        let allocation = self.heap.allocation_at(offset)?;
        self.heap.deallocate(allocation)
    }

    /// Move `value` into the storage at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`allocate`](Self::allocate) on this adapter,
    /// must not have been deallocated, and must not currently hold a live
    /// value (it would be overwritten without being dropped).
    pub unsafe fn construct(&self, ptr: NonNull<T>, value: T) {
        // SAFETY: the caller guarantees `ptr` is live, word-aligned storage
        // for a `T` (alignment checked in `allocate`).
        unsafe { ptr.as_ptr().write(value) }
    }

    /// Drop the value at `ptr` in place, leaving the storage allocated.
    ///
    /// # Safety
    ///
    /// `ptr` must hold a value previously written with
    /// [`construct`](Self::construct) and not yet destroyed.
    pub unsafe fn destroy(&self, ptr: NonNull<T>) {
        // SAFETY: the caller guarantees `ptr` holds an initialised `T`.
        unsafe { ptr.as_ptr().drop_in_place() }
    }

    /// Largest element count that could be requested without overflow.
    pub fn max_size(&self) -> usize {
        match mem::size_of::<T>() {
            0 => usize::MAX,
            size => usize::MAX / size,
        }
    }

    /// A fresh adapter for another element type with the same configuration.
    pub fn rebind<U>(&self) -> ArenaAdapter<U> {
        ArenaAdapter {
            heap: self.heap.empty_like(),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ArenaAdapter<T> {
    fn default() -> Self {
        Self {
            heap: TagHeap::default(),
            _marker: PhantomData,
        }
    }
}

/// Cloning yields a fresh adapter with an empty arena of the same shape;
/// arena contents are never shared or copied.
impl<T> Clone for ArenaAdapter<T> {
    fn clone(&self) -> Self {
        self.rebind()
    }
}

impl<T, U> PartialEq<ArenaAdapter<U>> for ArenaAdapter<T> {
    fn eq(&self, _other: &ArenaAdapter<U>) -> bool {
        true
    }
}

impl<T> Eq for ArenaAdapter<T> {}

impl<T> fmt::Debug for ArenaAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaAdapter")
            .field("elem", &std::any::type_name::<T>())
            .field("heap", &self.heap)
            .finish()
    }
}
