use std::mem;

/// Header placed in front of every payload carved from the heap.
///
/// Headers are linked through `next`/`prev` in ascending address order, so
/// the list spans the whole managed region, free and live blocks alike.
#[repr(C)]
pub struct Block {
  /// Payload bytes following the header, header excluded.
  pub size: usize,
  pub is_free: bool,
  pub next: *mut Block,
  pub prev: *mut Block,
}

/// Bytes taken by a [`Block`] header.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

const _: () = assert!(HEADER_SIZE % crate::align::ALIGN == 0);

impl Block {
  pub fn new(
    size: usize,
    is_free: bool,
    next: *mut Block,
    prev: *mut Block,
  ) -> Self {
    Self {
      size,
      is_free,
      next,
      prev,
    }
  }

  /// Address of the first payload byte of `block`.
  ///
  /// # Safety
  ///
  /// `block` must point to a header inside the managed region.
  pub unsafe fn payload(block: *mut Block) -> *mut u8 {
    unsafe { (block as *mut u8).add(HEADER_SIZE) }
  }

  /// Recovers the header owning a payload address.
  ///
  /// # Safety
  ///
  /// `address` must have been produced by [`Block::payload`].
  pub unsafe fn from_payload(address: *mut u8) -> *mut Block {
    unsafe { address.sub(HEADER_SIZE) as *mut Block }
  }

  /// One past the last payload byte of `block`.
  ///
  /// # Safety
  ///
  /// `block` must point to an initialized header.
  pub unsafe fn end(block: *mut Block) -> *mut u8 {
    unsafe { Block::payload(block).add((*block).size) }
  }

  /// Carves a free block out of the tail of `block`, truncating `block` to
  /// `size` payload bytes. Returns the new remainder.
  ///
  /// ```text
  ///   before:  [hdr | size ......................... ]
  ///   after:   [hdr | size ] [hdr | old - size - hdr ]
  /// ```
  ///
  /// # Safety
  ///
  /// `block` must be an initialized header with
  /// `(*block).size > size + HEADER_SIZE`, and `size` must be a multiple of
  /// [`ALIGN`](crate::align::ALIGN) so the remainder header stays aligned.
  pub unsafe fn split(
    block: *mut Block,
    size: usize,
  ) -> *mut Block {
    unsafe {
      debug_assert!((*block).size > size + HEADER_SIZE);

      let remainder = Block::payload(block).add(size) as *mut Block;
      remainder.write(Block::new(
        (*block).size - size - HEADER_SIZE,
        true,
        (*block).next,
        block,
      ));

      if !(*remainder).next.is_null() {
        (*(*remainder).next).prev = remainder;
      }

      (*block).size = size;
      (*block).next = remainder;

      remainder
    }
  }

  /// Whether `block` has a free successor that starts right where its payload
  /// ends. Blocks from separate extensions of the source may have foreign
  /// memory between them and are never merged.
  ///
  /// # Safety
  ///
  /// `block` must point to an initialized header.
  pub unsafe fn can_absorb_next(block: *mut Block) -> bool {
    unsafe {
      let next = (*block).next;
      !next.is_null() && (*next).is_free && Block::end(block) == next as *mut u8
    }
  }

  /// Folds the successor of `block` into it. The successor's header becomes
  /// part of `block`'s payload and drops out of the list.
  ///
  /// # Safety
  ///
  /// `block` and `(*block).next` must be initialized, physically adjacent
  /// headers.
  pub unsafe fn absorb_next(block: *mut Block) {
    unsafe {
      let next = (*block).next;
      debug_assert!(!next.is_null());
      debug_assert_eq!(
        Block::end(block),
        next as *mut u8,
        "absorbed block is not physically adjacent"
      );

      (*block).size += HEADER_SIZE + (*next).size;
      (*block).next = (*next).next;

      if !(*block).next.is_null() {
        (*(*block).next).prev = block;
      }
    }
  }
}
