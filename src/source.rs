//! Where heap memory comes from.
//!
//! A [`HeapSource`] behaves like `sbrk(2)`: it moves a break address and
//! hands back the previous one. [`Sbrk`] is the real program break,
//! [`Arena`] is a private fixed-size region with a break of its own.

use std::{ptr, ptr::NonNull};

use libc::{c_void, intptr_t, sbrk};

use crate::align::ALIGN;

/// A contiguous region that grows at its end.
///
/// # Safety
///
/// Implementors must guarantee that a successful `extend(n)` returns the
/// previous break `p`, that `[p, p + n)` is writable memory owned exclusively
/// by the caller until it is handed back with a negative increment, and that
/// the break only moves upwards between two calls. Consecutive extensions do
/// not have to be contiguous; the heap only merges blocks that touch.
pub unsafe trait HeapSource {
  /// Moves the break by `increment` bytes and returns the previous break, or
  /// `None` when the region cannot be extended.
  ///
  /// # Safety
  ///
  /// A negative increment gives memory back; the caller must no longer use it.
  unsafe fn extend(
    &mut self,
    increment: isize,
  ) -> Option<NonNull<u8>>;

  /// Current break, without side effects.
  fn current_break(&self) -> *mut u8;
}

/// The process program break, driven through `sbrk(2)`.
pub struct Sbrk {
  _private: (),
}

impl Sbrk {
  /// # Safety
  ///
  /// `sbrk` is not synchronised: no other thread may move the program break
  /// while this source extends it, and nothing may shrink the break below
  /// memory this source handed out. Other code may grow the break in between
  /// extensions.
  pub const unsafe fn new() -> Self {
    Self { _private: () }
  }
}

unsafe impl HeapSource for Sbrk {
  unsafe fn extend(
    &mut self,
    increment: isize,
  ) -> Option<NonNull<u8>> {
    let address = unsafe { sbrk(increment as intptr_t) };

    if address == usize::MAX as *mut c_void {
      return None;
    }

    NonNull::new(address as *mut u8)
  }

  fn current_break(&self) -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }
}

#[cfg(test)]
pub(crate) static SBRK_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[derive(Clone, Copy)]
#[repr(C, align(16))]
struct Chunk([u8; ALIGN]);

/// A fixed-capacity buffer with its own break, aligned to
/// [`ALIGN`](crate::align::ALIGN).
///
/// Every arena is independent, so several heaps can live side by side in one
/// process. The buffer is released when the arena is dropped.
pub struct Arena {
  base: NonNull<Chunk>,
  chunks: usize,
  brk: usize,
}

// The arena is the only owner of its buffer.
unsafe impl Send for Arena {}

impl Arena {
  /// Creates an arena able to hand out at least `bytes` bytes.
  pub fn with_capacity(bytes: usize) -> Self {
    let chunks = bytes.div_ceil(ALIGN);
    let memory: Box<[Chunk]> = vec![Chunk([0; ALIGN]); chunks].into_boxed_slice();
    let base = NonNull::from(Box::leak(memory)).cast::<Chunk>();

    Self { base, chunks, brk: 0 }
  }

  /// Total bytes the arena can hand out.
  pub fn capacity(&self) -> usize {
    self.chunks * ALIGN
  }

  /// Bytes below the break.
  pub fn used(&self) -> usize {
    self.brk
  }

  fn base(&self) -> *mut u8 {
    self.base.as_ptr() as *mut u8
  }
}

unsafe impl HeapSource for Arena {
  unsafe fn extend(
    &mut self,
    increment: isize,
  ) -> Option<NonNull<u8>> {
    let previous = self.brk;
    let brk = previous.checked_add_signed(increment)?;

    if brk > self.capacity() {
      return None;
    }

    self.brk = brk;

    NonNull::new(self.base().wrapping_add(previous))
  }

  fn current_break(&self) -> *mut u8 {
    self.base().wrapping_add(self.brk)
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    let memory = ptr::slice_from_raw_parts_mut(self.base.as_ptr(), self.chunks);
    drop(unsafe { Box::from_raw(memory) });
  }
}

impl std::fmt::Debug for Arena {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    f.debug_struct("Arena")
      .field("base", &self.base)
      .field("capacity", &self.capacity())
      .field("used", &self.brk)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_arena_extend_returns_previous_break() {
    let mut arena = Arena::with_capacity(256);
    let start = arena.current_break();

    unsafe {
      assert_eq!(arena.extend(64).unwrap().as_ptr(), start);
      assert_eq!(arena.extend(32).unwrap().as_ptr(), start.wrapping_add(64));
    }

    assert_eq!(arena.used(), 96);
    assert_eq!(arena.current_break(), start.wrapping_add(96));
  }

  #[test]
  fn test_arena_zero_extend_is_a_query() {
    let mut arena = Arena::with_capacity(128);

    unsafe {
      arena.extend(40).unwrap();
      let before = arena.current_break();
      assert_eq!(arena.extend(0).unwrap().as_ptr(), before);
    }

    assert_eq!(arena.used(), 40);
  }

  #[test]
  fn test_arena_exhaustion_leaves_break_alone() {
    let mut arena = Arena::with_capacity(100);
    let capacity = arena.capacity();

    unsafe {
      assert!(arena.extend(capacity as isize + 1).is_none());
      assert_eq!(arena.used(), 0);

      assert!(arena.extend(capacity as isize).is_some());
      assert!(arena.extend(1).is_none());
      assert!(arena.extend(-1_000_000).is_none());
    }

    assert_eq!(arena.used(), capacity);
  }

  #[test]
  fn test_arena_is_aligned() {
    let arena = Arena::with_capacity(17);

    assert_eq!(arena.capacity(), 2 * ALIGN);
    assert_eq!(arena.current_break() as usize % ALIGN, 0);
  }

  #[test]
  fn test_sbrk_reports_a_break() {
    let _serial = SBRK_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let source = unsafe { Sbrk::new() };

    assert!(!source.current_break().is_null());
  }
}
