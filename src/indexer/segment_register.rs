use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug, Display, Formatter};

use crate::common::alive_bitset::AliveBitSetBuilder;
use crate::index::{Index, SegmentId, SegmentMeta, SegmentReader};
use crate::indexer::segment_entry::SegmentEntry;

/// Tracks the set of segments currently in one state (committed or
/// uncommitted) along with their deletions. Consumed by `Index` to list
/// searchable segments, and by merge policies to find merge candidates.
#[derive(Default)]
pub struct SegmentRegister {
    segment_states: HashMap<SegmentId, SegmentEntry>,
}

impl Debug for SegmentRegister {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentRegister(")?;
        for k in self.segment_states.keys() {
            write!(f, "{k}, ")?;
        }
        write!(f, ")")
    }
}

impl Display for SegmentRegister {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl SegmentRegister {
    pub fn clear(&mut self) {
        self.segment_states.clear();
    }

    /// Segment entries not currently excluded by `in_merge_segment_ids`.
    pub fn get_mergeable_segments(&self, in_merge_segment_ids: &HashSet<SegmentId>) -> Vec<SegmentEntry> {
        self.segment_states
            .values()
            .filter(|entry| !in_merge_segment_ids.contains(&entry.segment_id()))
            .cloned()
            .collect()
    }

    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.segment_states.keys().cloned().collect()
    }

    pub fn segment_entries(&self) -> Vec<SegmentEntry> {
        self.segment_states.values().cloned().collect()
    }

    pub fn segment_metas(&self) -> Vec<SegmentMeta> {
        self.segment_states.values().map(|entry| entry.meta().clone()).collect()
    }

    pub fn contains_all(&self, segment_ids: &[SegmentId]) -> bool {
        segment_ids.iter().all(|id| self.segment_states.contains_key(id))
    }

    pub fn add_segment_entry(&mut self, segment_entry: SegmentEntry) {
        self.segment_states.insert(segment_entry.segment_id(), segment_entry);
    }

    pub fn remove_segment(&mut self, segment_id: &SegmentId) {
        self.segment_states.remove(segment_id);
    }

    pub fn get(&self, segment_id: &SegmentId) -> Option<SegmentEntry> {
        self.segment_states.get(segment_id).cloned()
    }

    /// Marks every doc matching `field`/`term` as deleted in every segment
    /// currently in this register. No ordering is tracked against the
    /// opstamp a document was added at: a doc racing the delete may or may
    /// not survive it, which is a deliberate simplification; see
    /// `DocToOpstampMapping`'s doc comment for the precise semantics this
    /// falls short of.
    pub fn apply_term_delete(&mut self, index: &Index, field: &str, term: &[u8]) -> crate::Result<()> {
        for entry in self.segment_states.values_mut() {
            let segment = index.segment(entry.meta().clone());
            let reader = SegmentReader::open(&segment)?.with_alive_bitset(entry.alive_bitset().cloned());
            let Some(term_postings) = reader.term_postings(field, term) else { continue };
            if term_postings.postings.is_empty() {
                continue;
            }
            let mut builder = match entry.alive_bitset() {
                Some(bitset) => {
                    let mut b = AliveBitSetBuilder::for_all_alive(bitset.num_docs());
                    for doc in 0..bitset.num_docs() {
                        if !bitset.is_alive(doc) {
                            b.delete(doc);
                        }
                    }
                    b
                }
                None => AliveBitSetBuilder::for_all_alive(entry.meta().num_docs()),
            };
            for posting in &term_postings.postings {
                if builder.is_alive(posting.doc) {
                    builder.delete(posting.doc);
                }
            }
            entry.set_alive_bitset(builder.build());
        }
        Ok(())
    }

    pub fn new(segment_metas: Vec<SegmentMeta>) -> SegmentRegister {
        let mut segment_states = HashMap::new();
        for segment_meta in segment_metas {
            let segment_id = segment_meta.id();
            segment_states.insert(segment_id, SegmentEntry::new(segment_meta, None));
        }
        SegmentRegister { segment_states }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SegmentMetaInventory;

    fn segment_ids(register: &SegmentRegister) -> Vec<SegmentId> {
        register.segment_metas().into_iter().map(|meta| meta.id()).collect()
    }

    #[test]
    fn test_segment_register() {
        let inventory = SegmentMetaInventory::default();

        let mut segment_register = SegmentRegister::default();
        let segment_id_a = SegmentId::generate_random();
        let segment_id_b = SegmentId::generate_random();
        let segment_id_merged = SegmentId::generate_random();

        let meta_a = inventory.new_segment_meta(segment_id_a, 0);
        segment_register.add_segment_entry(SegmentEntry::new(meta_a, None));
        assert_eq!(segment_ids(&segment_register), vec![segment_id_a]);

        let meta_b = inventory.new_segment_meta(segment_id_b, 0);
        segment_register.add_segment_entry(SegmentEntry::new(meta_b, None));
        segment_register.remove_segment(&segment_id_a);
        segment_register.remove_segment(&segment_id_b);

        let meta_merged = inventory.new_segment_meta(segment_id_merged, 0);
        segment_register.add_segment_entry(SegmentEntry::new(meta_merged, None));
        assert_eq!(segment_ids(&segment_register), vec![segment_id_merged]);
    }
}
