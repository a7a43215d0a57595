//! Read-only views over the block list.

use std::{fmt, marker::PhantomData};

use crate::{
  block::Block,
  heap::Heap,
  source::HeapSource,
};

/// First header address and current break of a heap.
///
/// `start` is null until the first successful allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapBounds {
  pub start: *mut u8,
  pub end: *mut u8,
}

/// Snapshot of one block, as seen by [`Heap::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Payload address, the pointer a caller would hold.
  pub address: *mut u8,
  pub size: usize,
  pub is_free: bool,
}

/// Walks a heap's blocks in address order.
pub struct Blocks<'a> {
  current: *mut Block,
  _heap: PhantomData<&'a ()>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    if self.current.is_null() {
      return None;
    }

    unsafe {
      let block = self.current;
      self.current = (*block).next;

      Some(BlockInfo {
        address: Block::payload(block),
        size: (*block).size,
        is_free: (*block).is_free,
      })
    }
  }
}

impl<S: HeapSource> Heap<S> {
  /// Logs (unless [silent](Heap::silent)) and returns where the heap starts and where the break currently is.
  pub fn report_heap_bounds(&self) -> HeapBounds {
    let bounds = HeapBounds {
      start: self.start as *mut u8,
      end: self.source.current_break(),
    };

    heap_event!(self, info, "heap starts at {:?}, ends at {:?}", bounds.start, bounds.end);

    bounds
  }

  /// Payload bytes held by blocks that have not been released.
  ///
  /// This is a raw sum: memory kept on purpose counts the same as memory that
  /// was forgotten.
  pub fn outstanding_bytes(&self) -> usize {
    self
      .blocks()
      .filter(|block| !block.is_free)
      .map(|block| block.size)
      .sum()
  }

  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      current: self.start,
      _heap: PhantomData,
    }
  }

  /// Payload bytes available behind `address`, which may exceed what was
  /// requested.
  ///
  /// # Safety
  ///
  /// `address` must be a live pointer returned by this heap.
  pub unsafe fn usable_size(
    &self,
    address: *mut u8,
  ) -> usize {
    unsafe { (*self.block_of(address)).size }
  }
}

impl<S: HeapSource> fmt::Debug for Heap<S> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Heap")
      .field("start", &self.start)
      .field("end", &self.source.current_break())
      .field("blocks", &self.blocks().collect::<Vec<_>>())
      .finish()
  }
}
