//! Per-segment liveness tracking.
//!
//! A segment's postings are append-only and immutable; deletes are recorded
//! out of band as a bitset of dead local doc ids. `AliveBitSet` is the
//! read-side view consumed during scans; `AliveBitSetBuilder` is the
//! write-side accumulator a `Snapshot` rebuild mutates.

use std::sync::Arc;

use ownedbytes::OwnedBytes;

/// An immutable, shareable bitset recording which local doc ids in a segment
/// are still alive (not deleted).
#[derive(Clone)]
pub struct AliveBitSet {
    data: OwnedBytes,
    num_docs: u32,
}

impl AliveBitSet {
    /// Builds a bitset in which every doc up to `num_docs` is alive.
    pub fn for_all_alive(num_docs: u32) -> Self {
        let num_bytes = (num_docs as usize).div_ceil(8);
        AliveBitSet { data: OwnedBytes::new(vec![0xffu8; num_bytes]), num_docs }
    }

    /// Wraps pre-built bitset bytes, little-endian bit order within each byte.
    pub fn from_bytes(data: OwnedBytes, num_docs: u32) -> Self {
        AliveBitSet { data, num_docs }
    }

    /// True if `doc` has not been deleted.
    #[inline]
    pub fn is_alive(&self, doc: u32) -> bool {
        if doc >= self.num_docs {
            return false;
        }
        let byte = self.data.as_slice()[(doc / 8) as usize];
        (byte >> (doc % 8)) & 1 == 1
    }

    /// True if `doc` has been deleted.
    #[inline]
    pub fn is_deleted(&self, doc: u32) -> bool {
        !self.is_alive(doc)
    }

    /// Number of docs tracked by this bitset (alive or not).
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// Counts the number of alive docs. O(num_docs / 8).
    pub fn num_alive(&self) -> u32 {
        (0..self.num_docs).filter(|&d| self.is_alive(d)).count() as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }
}

/// Mutable builder a `SegmentWriter`/delete-application pass writes into.
#[derive(Default)]
pub struct AliveBitSetBuilder {
    bytes: Vec<u8>,
    num_docs: u32,
}

impl AliveBitSetBuilder {
    pub fn for_all_alive(num_docs: u32) -> Self {
        let num_bytes = (num_docs as usize).div_ceil(8);
        AliveBitSetBuilder { bytes: vec![0xffu8; num_bytes], num_docs }
    }

    pub fn delete(&mut self, doc: u32) {
        assert!(doc < self.num_docs, "doc {doc} out of range ({})", self.num_docs);
        let idx = (doc / 8) as usize;
        self.bytes[idx] &= !(1 << (doc % 8));
    }

    pub fn is_alive(&self, doc: u32) -> bool {
        (self.bytes[(doc / 8) as usize] >> (doc % 8)) & 1 == 1
    }

    pub fn build(self) -> AliveBitSet {
        AliveBitSet { data: OwnedBytes::new(self.bytes), num_docs: self.num_docs }
    }

    pub fn build_arc(self) -> Arc<AliveBitSet> {
        Arc::new(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_alive() {
        let bitset = AliveBitSet::for_all_alive(10);
        for doc in 0..10 {
            assert!(bitset.is_alive(doc));
        }
        assert_eq!(bitset.num_alive(), 10);
    }

    #[test]
    fn test_delete_and_query() {
        let mut builder = AliveBitSetBuilder::for_all_alive(16);
        builder.delete(3);
        builder.delete(15);
        let bitset = builder.build();
        assert!(!bitset.is_alive(3));
        assert!(!bitset.is_alive(15));
        assert!(bitset.is_alive(4));
        assert_eq!(bitset.num_alive(), 14);
    }

    #[test]
    fn test_out_of_range_is_dead() {
        let bitset = AliveBitSet::for_all_alive(4);
        assert!(!bitset.is_alive(10));
    }
}
