//! A `Vec<u8>`-like byte buffer that owns the allocation it was sliced from,
//! so that a `FileSlice` can hand out zero-copy sub-ranges of a memory map
//! without pinning the whole mapping's lifetime to the slice's lifetime.

use std::ops::{Deref, Range};
use std::sync::Arc;

use stable_deref_trait::StableDeref;

/// An owned, cheaply cloneable and sliceable view over a byte region.
///
/// Cloning an `OwnedBytes` is cheap: it bumps a refcount on the underlying
/// allocation (which may be a `Vec<u8>`, a `memmap2::Mmap`, or anything else
/// implementing `StableDeref<Target = [u8]>`) and keeps an independent
/// `(start, end)` window into it.
#[derive(Clone)]
pub struct OwnedBytes {
    data: *const [u8],
    box_stable_deref: Arc<dyn StableDeref<Target = [u8]> + Sync + Send>,
}

// SAFETY: `data` is always a subslice of the data owned by `box_stable_deref`,
// which is itself `Sync + Send`. `data` is never mutated.
unsafe impl Send for OwnedBytes {}
unsafe impl Sync for OwnedBytes {}

impl OwnedBytes {
    /// Creates an `OwnedBytes` from any owner implementing `StableDeref`.
    pub fn new<T: StableDeref<Target = [u8]> + Sync + Send + 'static>(data_holder: T) -> Self {
        let box_stable_deref = Arc::new(data_holder);
        let bytes: &[u8] = box_stable_deref.as_ref();
        OwnedBytes { data: bytes as *const [u8], box_stable_deref }
    }

    /// Empty `OwnedBytes`.
    pub fn empty() -> Self {
        OwnedBytes::new(&[][..])
    }

    /// Returns the underlying byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `data` was derived from `box_stable_deref` and `StableDeref`
        // guarantees the pointee address does not change even if the Arc
        // holder moves.
        unsafe { &*self.data }
    }

    /// Returns the number of bytes in this view.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true if this view is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a new `OwnedBytes` restricted to `range`, sharing the same
    /// underlying allocation.
    pub fn slice(&self, range: Range<usize>) -> OwnedBytes {
        let sub_slice = &self.as_slice()[range];
        OwnedBytes { data: sub_slice as *const [u8], box_stable_deref: self.box_stable_deref.clone() }
    }

    /// Splits off the first `split_point` bytes, returning `(left, right)`.
    pub fn split(self, split_point: usize) -> (OwnedBytes, OwnedBytes) {
        let len = self.len();
        let left = self.slice(0..split_point);
        let right = self.slice(split_point..len);
        (left, right)
    }

    /// Advances this view past the first `len` bytes, returning them.
    pub fn read_bytes(&mut self, len: usize) -> OwnedBytes {
        let result = self.slice(0..len);
        *self = self.slice(len..self.len());
        result
    }
}

impl Deref for OwnedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for OwnedBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for OwnedBytes {
    fn from(data: Vec<u8>) -> Self {
        OwnedBytes::new(data)
    }
}

impl std::fmt::Debug for OwnedBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.as_slice();
        let truncated = bytes.len() > 16;
        let shown = &bytes[..bytes.len().min(16)];
        write!(f, "OwnedBytes({:?}{})", shown, if truncated { "..." } else { "" })
    }
}

impl PartialEq for OwnedBytes {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for OwnedBytes {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_bytes_basic() {
        let bytes = OwnedBytes::new(vec![1u8, 2, 3, 4, 5]);
        assert_eq!(bytes.as_slice(), &[1, 2, 3, 4, 5]);
        let sliced = bytes.slice(1..3);
        assert_eq!(sliced.as_slice(), &[2, 3]);
    }

    #[test]
    fn test_owned_bytes_split() {
        let bytes = OwnedBytes::new(vec![1u8, 2, 3, 4, 5]);
        let (left, right) = bytes.split(2);
        assert_eq!(left.as_slice(), &[1, 2]);
        assert_eq!(right.as_slice(), &[3, 4, 5]);
    }

    #[test]
    fn test_owned_bytes_read_bytes() {
        let mut bytes = OwnedBytes::new(vec![1u8, 2, 3, 4, 5]);
        let head = bytes.read_bytes(2);
        assert_eq!(head.as_slice(), &[1, 2]);
        assert_eq!(bytes.as_slice(), &[3, 4, 5]);
    }

    #[test]
    fn test_owned_bytes_empty() {
        assert!(OwnedBytes::empty().is_empty());
    }
}
