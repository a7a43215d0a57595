use std::fmt;

/// Why a request could not be served.
///
/// A failed request leaves the heap untouched; the same request may succeed
/// later once memory has been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// A request for zero bytes.
  ZeroSize,
  /// The size does not fit in a `usize` once rounded and given a header, or
  /// `count * elem_size` overflowed.
  SizeOverflow,
  /// The heap source refused to grow.
  Exhausted,
}

impl fmt::Display for AllocError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      AllocError::ZeroSize => write!(f, "cannot allocate zero bytes"),
      AllocError::SizeOverflow => write!(f, "requested size overflows the address space"),
      AllocError::Exhausted => write!(f, "heap source cannot be extended"),
    }
  }
}

impl std::error::Error for AllocError {}
