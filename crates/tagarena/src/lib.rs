//! Fixed-arena, first-fit memory allocation with boundary-tag coalescing.
//!
//! A [`TagHeap`] owns one pre-reserved, word-aligned byte arena and carves
//! it into variable-sized blocks on request. All bookkeeping is in-band:
//! each block carries a leading and a trailing tag holding its payload size
//! and free flag, so the heap needs no side tables.
//!
//! # Architecture
//!
//! ```text
//! ArenaAdapter<T> (typed, container-facing)
//! └── TagHeap (first-fit allocate / coalescing deallocate / walks)
//!     ├── HeapConfig (arena size, split threshold, minimum payload)
//!     └── RawArena (owned word-aligned buffer; the only raw memory access)
//! ```
//!
//! # Placement and release
//!
//! - **allocate:** scan blocks in address order and take the first free one
//!   that fits. Split it if the slack exceeds the split threshold,
//!   otherwise hand it out whole.
//! - **deallocate:** mark the block free, then merge with a free left
//!   neighbour (found through its trailing tag) and a free right neighbour.
//!   No two free blocks are ever adjacent afterwards.
//!
//! # Example
//!
//! ```
//! use tagarena::{HeapConfig, TagHeap};
//!
//! let mut heap = TagHeap::new(HeapConfig::new(4096)).unwrap();
//! let a = heap.allocate(100).unwrap();
//! heap.payload_mut(a).unwrap()[0] = 42;
//! assert_eq!(heap.used_block_count(), 1);
//!
//! heap.deallocate(a).unwrap();
//! assert_eq!(heap.free_block_count(), 1);
//! assert_eq!(heap.largest_free_block(), Some(heap.capacity()));
//! ```
//!
//! # Threading
//!
//! Single-threaded by construction: mutation requires `&mut TagHeap`.
//! Share a heap between threads by wrapping it in a `Mutex`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod adapter;
pub mod config;
pub mod error;
pub mod handle;
pub mod heap;
pub mod inspect;
mod raw;
pub mod tag;

// Public re-exports for the primary API surface.
pub use adapter::ArenaAdapter;
pub use config::HeapConfig;
pub use error::{AllocError, ConfigError, HeapError};
pub use handle::Allocation;
pub use heap::TagHeap;
pub use inspect::{BlockInfo, Blocks};
pub use tag::{BLOCK_OVERHEAD, TAG_SIZE, WORD};
