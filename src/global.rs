//! Installing the heap as the process allocator.
//!
//! ```rust,ignore
//! use fitalloc::SbrkAlloc;
//!
//! #[global_allocator]
//! static ALLOCATOR: SbrkAlloc = unsafe { SbrkAlloc::new() };
//! ```

use std::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
};

use spin::Mutex;

use crate::{
  align::ALIGN,
  diagnostics::HeapBounds,
  heap::Heap,
  source::Sbrk,
};

/// A [`Heap`] over the program break, behind a spin lock, usable as
/// `#[global_allocator]`.
///
/// The inner heap is [silent](Heap::silent), so allocating from inside a
/// `tracing` subscriber cannot re-enter the lock. Alignments above
/// [`ALIGN`] are refused with a null pointer.
pub struct SbrkAlloc {
  heap: Mutex<Heap<Sbrk>>,
}

impl SbrkAlloc {
  /// # Safety
  ///
  /// Same contract as [`Sbrk::new`]. Once installed as the global allocator,
  /// this is the only Rust code moving the break.
  pub const unsafe fn new() -> Self {
    Self {
      heap: Mutex::new(Heap::silent(unsafe { Sbrk::new() })),
    }
  }

  /// See [`Heap::outstanding_bytes`].
  pub fn outstanding_bytes(&self) -> usize {
    self.heap.lock().outstanding_bytes()
  }

  /// See [`Heap::report_heap_bounds`]. Nothing is logged.
  pub fn heap_bounds(&self) -> HeapBounds {
    self.heap.lock().report_heap_bounds()
  }
}

fn into_raw<E>(result: Result<NonNull<u8>, E>) -> *mut u8 {
  result.map_or(ptr::null_mut(), NonNull::as_ptr)
}

unsafe impl GlobalAlloc for SbrkAlloc {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > ALIGN {
      return ptr::null_mut();
    }

    into_raw(self.heap.lock().allocate(layout.size()))
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.heap.lock().deallocate(ptr) }
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > ALIGN {
      return ptr::null_mut();
    }

    into_raw(self.heap.lock().zero_allocate(1, layout.size()))
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > ALIGN {
      return ptr::null_mut();
    }

    into_raw(unsafe { self.heap.lock().resize(ptr, new_size) })
  }
}
