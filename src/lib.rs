//! # fitalloc - A Best-Fit Free-List Allocator
//!
//! This crate provides a **best-fit free-list allocator** that manages a single
//! growable region, by default the process heap extended through `sbrk`.
//!
//! ## Overview
//!
//! Every region handed out is preceded by a header. The headers form one
//! doubly linked list in address order, covering live and free blocks alike:
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌────┬──────┬────┬──────────┬────┬────┬────┬────────────────┐      │
//!   │   │ H  │ live │ H  │   free   │ H  │live│ H  │      free      │      │
//!   │   └────┴──────┴────┴──────────┴────┴────┴────┴────────────────┘      │
//!   │     ▲  ────────▶ ▲ ◀────────  ▲                                ▲     │
//!   │     │   next/prev links       │                                │     │
//!   │  heap start               (address order)                 Program    │
//!   │                                                             Break    │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   fitalloc
//!   ├── align        - 16-byte rounding of request sizes
//!   ├── block        - Block header, split and merge (internal)
//!   ├── source       - HeapSource trait, Sbrk and Arena
//!   ├── heap         - Heap: allocate, deallocate, zero_allocate, resize
//!   ├── diagnostics  - Heap bounds, outstanding bytes, block walk
//!   ├── global       - SbrkAlloc, a GlobalAlloc over the program break
//!   └── error        - AllocError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use fitalloc::{Arena, Heap};
//!
//! let mut heap = Heap::new(Arena::with_capacity(4096));
//!
//! let ptr = heap.allocate(8).unwrap().as_ptr() as *mut usize;
//!
//! unsafe {
//!     // Use the memory
//!     ptr.write(42);
//!     assert_eq!(ptr.read(), 42);
//!
//!     // Free the memory
//!     heap.deallocate(ptr as *mut u8);
//! }
//!
//! assert_eq!(heap.outstanding_bytes(), 0);
//! ```
//!
//! ## How It Works
//!
//! An allocation scans the whole list and picks the **smallest** free block
//! that fits, the earliest one on ties. If that block has room for another
//! header after the request, it is split:
//!
//! ```text
//!   Split (request s from a free block of n bytes, n > s + header):
//!
//!   ┌────────┬───────────────────────────────────────┐
//!   │ header │               n bytes                 │
//!   └────────┴───────────────────────────────────────┘
//!                         │
//!                         ▼
//!   ┌────────┬───────────┬────────┬──────────────────┐
//!   │ header │  s bytes  │ header │ n - s - header   │
//!   │  live  │           │  free  │                  │
//!   └────────┴───────────┴────────┴──────────────────┘
//! ```
//!
//! If nothing fits, the source is extended by one header plus the request and
//! the new block is appended to the list.
//!
//! A release marks the block free and merges it with a free successor, then
//! with a free predecessor, so no two neighbours are ever both free:
//!
//! ```text
//!   Coalescing:
//!
//!   ┌───┬──────┬───┬──────┬───┬──────┐       ┌───┬──────────────────────┐
//!   │ H │ free │ H │ FREED│ H │ free │  ───▶ │ H │ free (all three +2H) │
//!   └───┴──────┴───┴──────┴───┴──────┘       └───┴──────────────────────┘
//! ```
//!
//! Request sizes are rounded up to a multiple of 16 bytes so that every
//! header and every payload lands on a 16-byte boundary.
//!
//! Blocks are only merged when they touch. Something else in the process may
//! move the break between two extensions, leaving foreign bytes between two
//! blocks of the same list; those blocks stay apart.
//!
//! ## As the global allocator
//!
//! ```rust,ignore
//! #[global_allocator]
//! static ALLOCATOR: fitalloc::SbrkAlloc = unsafe { fitalloc::SbrkAlloc::new() };
//! ```
//!
//! ## Limitations
//!
//! - **No internal locking**: `Heap` is `Send` but not `Sync`; `SbrkAlloc`
//!   wraps it in a spin lock
//! - **Grow only**: memory is never handed back to the source
//! - **O(n) search**: every allocation walks the full block list
//! - **No in-place growth**: a growing resize always moves the payload
//! - **16-byte alignment only**: larger alignments are refused
//!
//! ## Safety
//!
//! Allocation is safe. Releasing or resizing takes raw pointers and is
//! `unsafe`: passing a pointer that this heap did not hand out, or one that
//! was already released, is undefined behaviour and is not detected.

/// Emits a `tracing` event unless the heap was built with [`Heap::silent`].
macro_rules! heap_event {
  ($heap:expr, $level:ident, $($arg:tt)+) => {
    if $heap.logging {
      tracing::$level!($($arg)+);
    }
  };
}

pub mod align;
mod block;
mod diagnostics;
mod error;
mod global;
mod heap;
mod source;

pub use block::HEADER_SIZE;
pub use diagnostics::{BlockInfo, Blocks, HeapBounds};
pub use error::AllocError;
pub use global::SbrkAlloc;
pub use heap::Heap;
pub use source::{Arena, HeapSource, Sbrk};
