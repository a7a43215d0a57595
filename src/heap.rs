use std::ptr::{self, NonNull};

use crate::{
  align::align_up,
  block::{Block, HEADER_SIZE},
  error::AllocError,
  source::HeapSource,
};

/// A best-fit allocator over one growable region.
///
/// The heap owns its [`HeapSource`] and the head of the block list. The head
/// is fixed by the first successful growth and never changes afterwards;
/// blocks only ever get split or merged in place.
///
/// `Heap` is `Send` when its source is, but never `Sync`: every operation
/// assumes a single caller. Sharing one heap between threads needs a lock
/// around the whole value, as [`SbrkAlloc`](crate::SbrkAlloc) does.
pub struct Heap<S: HeapSource> {
  pub(crate) source: S,
  pub(crate) start: *mut Block,
  pub(crate) logging: bool,
}

// The blocks belong to the heap alone; nothing else holds their addresses.
unsafe impl<S: HeapSource + Send> Send for Heap<S> {}

impl<S: HeapSource> Heap<S> {
  pub const fn new(source: S) -> Self {
    Self {
      source,
      start: ptr::null_mut(),
      logging: true,
    }
  }

  /// A heap that emits no `tracing` events.
  ///
  /// A heap serving the global allocator must be silent: a subscriber that
  /// allocates while formatting an event would re-enter it.
  pub const fn silent(source: S) -> Self {
    Self {
      source,
      start: ptr::null_mut(),
      logging: false,
    }
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  /// Smallest free block holding at least `size` bytes, earliest address on
  /// ties. Null when nothing fits.
  fn find_best_fit(
    &self,
    size: usize,
  ) -> *mut Block {
    unsafe {
      let mut current = self.start;
      let mut best: *mut Block = ptr::null_mut();

      while !current.is_null() {
        if (*current).is_free
          && (*current).size >= size
          && (best.is_null() || (*current).size < (*best).size)
        {
          best = current;
        }
        current = (*current).next;
      }

      if !best.is_null() {
        heap_event!(self, trace, "best fit for {} bytes: {:?} ({} bytes)", size, best, (*best).size);
      }

      best
    }
  }

  fn tail(&self) -> *mut Block {
    unsafe {
      let mut current = self.start;
      while !current.is_null() && !(*current).next.is_null() {
        current = (*current).next;
      }
      current
    }
  }

  /// Grows the source by one header plus `size` bytes and appends the new
  /// block after `last`.
  ///
  /// Someone else may have moved the break since the last extension, so the
  /// new block is not assumed to touch `last`; merging checks adjacency.
  fn request_space(
    &mut self,
    last: *mut Block,
    size: usize,
  ) -> Result<*mut Block, AllocError> {
    // The break may start off unaligned; skip to the next boundary.
    let brk = self.source.current_break() as usize;
    let padding = align_up(brk).ok_or(AllocError::Exhausted)? - brk;

    let increment = size
      .checked_add(HEADER_SIZE + padding)
      .and_then(|total| isize::try_from(total).ok())
      .ok_or(AllocError::SizeOverflow)?;

    let Some(address) = (unsafe { self.source.extend(increment) }) else {
      heap_event!(self, warn, "heap source refused to grow by {} bytes", increment);
      return Err(AllocError::Exhausted);
    };

    unsafe {
      let block = address.as_ptr().add(padding) as *mut Block;
      block.write(Block::new(size, false, ptr::null_mut(), last));

      if !last.is_null() {
        if Block::end(last) != block as *mut u8 {
          heap_event!(
            self,
            debug,
            "break moved by someone else: {} foreign bytes before {:?}",
            block as usize - Block::end(last) as usize,
            block
          );
        }
        (*last).next = block;
      }

      if self.start.is_null() {
        self.start = block;
      }

      heap_event!(
        self,
        debug,
        "grew heap by {} bytes, new block {:?}, break = {:?}",
        increment,
        block,
        self.source.current_break()
      );

      Ok(block)
    }
  }

  /// Hands out at least `size` bytes.
  ///
  /// The request is rounded up to a multiple of
  /// [`ALIGN`](crate::align::ALIGN). The smallest free block that fits is
  /// reused, split when the excess can hold another header; otherwise the
  /// heap grows by one block.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let size = align_up(size).ok_or(AllocError::SizeOverflow)?;

    let block = if self.start.is_null() {
      self.request_space(ptr::null_mut(), size)?
    } else {
      let found = self.find_best_fit(size);

      if found.is_null() {
        let last = self.tail();
        self.request_space(last, size)?
      } else {
        unsafe {
          if (*found).size > size + HEADER_SIZE {
            let remainder = Block::split(found, size);
            heap_event!(self, trace, "split {:?}, remainder {:?} has {} bytes", found, remainder, (*remainder).size);
          }
          (*found).is_free = false;
        }
        found
      }
    };

    let address = unsafe { Block::payload(block) };
    heap_event!(self, debug, "allocated {} bytes at {:?}", size, address);

    NonNull::new(address).ok_or(AllocError::Exhausted)
  }

  /// Releases the block behind `address` and merges it with free neighbours
  /// that touch it. A null address is ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer returned by this heap. Double
  /// frees and foreign pointers are not detected.
  pub unsafe fn deallocate(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    unsafe {
      let block = self.block_of(address);
      (*block).is_free = true;
      heap_event!(self, debug, "released {} bytes at {:?}", (*block).size, address);

      if Block::can_absorb_next(block) {
        Block::absorb_next(block);
      }

      let prev = (*block).prev;
      if !prev.is_null() && (*prev).is_free && Block::can_absorb_next(prev) {
        Block::absorb_next(prev);
        heap_event!(self, trace, "merged {:?} into {:?}, now {} bytes", block, prev, (*prev).size);
      }
    }
  }

  /// Allocates `count * elem_size` bytes, all zero.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    elem_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let total = count
      .checked_mul(elem_size)
      .ok_or(AllocError::SizeOverflow)?;

    let address = self.allocate(total)?;
    unsafe { ptr::write_bytes(address.as_ptr(), 0, total) };

    Ok(address)
  }

  /// Changes the size of the block behind `address`.
  ///
  /// A null address allocates. Shrinking never moves the payload; the spare
  /// tail is split off when it can hold a header. Growing always moves: a new
  /// block is allocated, the old payload copied over and the old block
  /// released. On failure the original block is left as it was.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer returned by this heap.
  pub unsafe fn resize(
    &mut self,
    address: *mut u8,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let Some(current) = NonNull::new(address) else {
      return self.allocate(size);
    };

    unsafe {
      let block = self.block_of(address);
      let old_size = (*block).size;

      if old_size >= size {
        // Payload sizes are ALIGN multiples, so this cannot exceed old_size.
        let size = align_up(size).ok_or(AllocError::SizeOverflow)?;

        if old_size > size + HEADER_SIZE {
          let remainder = Block::split(block, size);
          if Block::can_absorb_next(remainder) {
            Block::absorb_next(remainder);
          }
        }

        heap_event!(self, debug, "shrank {:?} from {} to {} bytes", address, old_size, size);
        return Ok(current);
      }

      let moved = self.allocate(size)?;
      ptr::copy_nonoverlapping(address, moved.as_ptr(), old_size);
      self.deallocate(address);

      heap_event!(self, debug, "moved {:?} to {:?} ({} -> {} bytes)", address, moved, old_size, size);
      Ok(moved)
    }
  }

  /// Header of a payload pointer handed out by this heap.
  ///
  /// # Safety
  ///
  /// `address` must be a payload pointer returned by this heap.
  pub(crate) unsafe fn block_of(
    &self,
    address: *mut u8,
  ) -> *mut Block {
    debug_assert!(
      !self.start.is_null()
        && address as usize >= self.start as usize + HEADER_SIZE
        && address <= self.source.current_break(),
      "{:?} does not belong to this heap",
      address
    );

    unsafe { Block::from_payload(address) }
  }
}
