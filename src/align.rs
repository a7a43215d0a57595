/// Granularity of every payload size and payload address.
///
/// Sixteen bytes covers every primitive type, `u128` included, and matches
/// what C `malloc` promises.
pub const ALIGN: usize = 16;

/// Rounds `size` up to the next multiple of [`ALIGN`].
///
/// Returns `None` when the rounded value does not fit in a `usize`.
///
/// # Examples
///
/// ```rust
/// use fitalloc::align::{ALIGN, align_up};
///
/// assert_eq!(align_up(13), Some(ALIGN));
/// assert_eq!(align_up(usize::MAX), None);
/// ```
pub const fn align_up(size: usize) -> Option<usize> {
  match size.checked_add(ALIGN - 1) {
    Some(padded) => Some(padded & !(ALIGN - 1)),
    None => None,
  }
}
