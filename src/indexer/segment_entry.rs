use std::fmt;

use crate::common::alive_bitset::AliveBitSet;
use crate::index::{SegmentId, SegmentMeta};

/// A segment as tracked by the `SegmentManager`: its metadata plus the
/// deletions accumulated against it since it was built (`None` until the
/// first delete lands).
#[derive(Clone)]
pub struct SegmentEntry {
    meta: SegmentMeta,
    alive_bitset: Option<AliveBitSet>,
}

impl SegmentEntry {
    pub fn new(meta: SegmentMeta, alive_bitset: Option<AliveBitSet>) -> SegmentEntry {
        SegmentEntry { meta, alive_bitset }
    }

    pub fn segment_id(&self) -> SegmentId {
        self.meta.id()
    }

    pub fn meta(&self) -> &SegmentMeta {
        &self.meta
    }

    pub fn alive_bitset(&self) -> Option<&AliveBitSet> {
        self.alive_bitset.as_ref()
    }

    /// Doc count after accounting for deletions, used by merge policies to
    /// decide which segments are worth merging.
    pub fn alive_num_docs(&self) -> u32 {
        match &self.alive_bitset {
            Some(bitset) => bitset.num_alive(),
            None => self.meta.num_docs(),
        }
    }

    pub(crate) fn set_alive_bitset(&mut self, alive_bitset: AliveBitSet) {
        self.alive_bitset = Some(alive_bitset);
    }
}

impl fmt::Debug for SegmentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentEntry({:?})", self.meta)
    }
}
