use std::collections::hash_set::HashSet;
use std::fmt::{self, Debug, Formatter};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::warn;

use super::segment_entry::SegmentEntry;
use super::segment_register::SegmentRegister;
use crate::common::errors::SearchError;
use crate::index::{Index, SegmentId, SegmentMeta};

#[derive(PartialEq, Eq)]
pub(crate) enum SegmentsStatus {
    Committed,
    Uncommitted,
}

#[derive(Default)]
struct SegmentRegisters {
    uncommitted: SegmentRegister,
    committed: SegmentRegister,
}

impl SegmentRegisters {
    /// The commit status shared by every id in `segment_ids`, or `None` if
    /// they don't all agree (or aren't all found).
    fn segments_status(&self, segment_ids: &[SegmentId]) -> Option<SegmentsStatus> {
        if self.uncommitted.contains_all(segment_ids) {
            Some(SegmentsStatus::Uncommitted)
        } else if self.committed.contains_all(segment_ids) {
            Some(SegmentsStatus::Committed)
        } else {
            warn!(
                "segment_ids: {:?}, committed: {:?}, uncommitted: {:?}",
                segment_ids,
                self.committed.segment_ids(),
                self.uncommitted.segment_ids()
            );
            None
        }
    }
}

/// Tracks segments across the committed/uncommitted boundary, and makes
/// atomic swaps (merges, commits) safe against concurrent readers of the
/// register.
#[derive(Default)]
pub struct SegmentManager {
    registers: RwLock<SegmentRegisters>,
}

impl Debug for SegmentManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let lock = self.read();
        write!(f, "{{ uncommitted: {:?}, committed: {:?} }}", lock.uncommitted, lock.committed)
    }
}

impl SegmentManager {
    fn read(&self) -> RwLockReadGuard<'_, SegmentRegisters> {
        self.registers.read().expect("SegmentManager lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, SegmentRegisters> {
        self.registers.write().expect("SegmentManager lock poisoned")
    }

    /// `segment_metas` are all treated as already committed.
    pub fn from_segments(segment_metas: Vec<SegmentMeta>) -> SegmentManager {
        SegmentManager {
            registers: RwLock::new(SegmentRegisters {
                uncommitted: SegmentRegister::default(),
                committed: SegmentRegister::new(segment_metas),
            }),
        }
    }

    /// Returns (committed mergeable, uncommitted mergeable), excluding any
    /// segment id already part of a running merge.
    pub fn get_mergeable_segments(&self, in_merge_segment_ids: &HashSet<SegmentId>) -> (Vec<SegmentEntry>, Vec<SegmentEntry>) {
        let registers_lock = self.read();
        (
            registers_lock.committed.get_mergeable_segments(in_merge_segment_ids),
            registers_lock.uncommitted.get_mergeable_segments(in_merge_segment_ids),
        )
    }

    pub fn segment_entries(&self) -> Vec<SegmentEntry> {
        let registers_lock = self.read();
        let mut entries = registers_lock.uncommitted.segment_entries();
        entries.extend(registers_lock.committed.segment_entries());
        entries
    }

    fn remove_empty_segments(&self) {
        let mut registers_lock = self.write();
        let empty: Vec<SegmentId> = registers_lock
            .committed
            .segment_entries()
            .iter()
            .filter(|entry| entry.alive_num_docs() == 0)
            .map(|entry| entry.segment_id())
            .collect();
        for segment_id in empty {
            registers_lock.committed.remove_segment(&segment_id);
        }
    }

    pub(crate) fn remove_all_segments(&self) {
        let mut registers_lock = self.write();
        registers_lock.committed.clear();
        registers_lock.uncommitted.clear();
    }

    pub fn commit(&self, segment_entries: Vec<SegmentEntry>) {
        let mut registers_lock = self.write();
        registers_lock.committed.clear();
        registers_lock.uncommitted.clear();
        for segment_entry in segment_entries {
            registers_lock.committed.add_segment_entry(segment_entry);
        }
    }

    /// Fetches the entries for `segment_ids`, which must all belong to the
    /// same register (committed or uncommitted).
    pub fn start_merge(&self, segment_ids: &[SegmentId]) -> crate::Result<Vec<SegmentEntry>> {
        let registers_lock = self.read();
        let mut segment_entries = vec![];
        if registers_lock.uncommitted.contains_all(segment_ids) {
            for segment_id in segment_ids {
                segment_entries.push(
                    registers_lock
                        .uncommitted
                        .get(segment_id)
                        .expect("segment id not found; should never happen given contains_all"),
                );
            }
        } else if registers_lock.committed.contains_all(segment_ids) {
            for segment_id in segment_ids {
                segment_entries.push(
                    registers_lock
                        .committed
                        .get(segment_id)
                        .expect("segment id not found; should never happen given contains_all"),
                );
            }
        } else {
            return Err(SearchError::InvalidConfig(
                "merge operation sent for segments that are not all uncommitted or committed".to_string(),
            ));
        }
        Ok(segment_entries)
    }

    pub fn add_segment(&self, segment_entry: SegmentEntry) {
        self.write().uncommitted.add_segment_entry(segment_entry);
    }

    /// Moves the post-merge segment into whichever register
    /// `before_merge_segment_ids` belonged to, removing the merged-away ids.
    pub(crate) fn end_merge(
        &self,
        before_merge_segment_ids: &[SegmentId],
        after_merge_segment_entry: Option<SegmentEntry>,
    ) -> crate::Result<SegmentsStatus> {
        let mut registers_lock = self.write();
        let segments_status = registers_lock.segments_status(before_merge_segment_ids).ok_or_else(|| {
            warn!("couldn't find segment in SegmentManager");
            SearchError::InvalidConfig(
                "the segments that were merged could not be found in the SegmentManager; this can happen after a rollback".to_string(),
            )
        })?;

        let target_register = match segments_status {
            SegmentsStatus::Uncommitted => &mut registers_lock.uncommitted,
            SegmentsStatus::Committed => &mut registers_lock.committed,
        };
        for segment_id in before_merge_segment_ids {
            target_register.remove_segment(segment_id);
        }
        if let Some(entry) = after_merge_segment_entry {
            target_register.add_segment_entry(entry);
        }
        Ok(segments_status)
    }

    /// Applies a term delete to every committed and uncommitted segment.
    pub fn apply_term_delete(&self, index: &Index, field: &str, term: &[u8]) -> crate::Result<()> {
        let mut registers_lock = self.write();
        registers_lock.committed.apply_term_delete(index, field, term)?;
        registers_lock.uncommitted.apply_term_delete(index, field, term)?;
        Ok(())
    }

    pub fn committed_segment_metas(&self) -> Vec<SegmentMeta> {
        self.remove_empty_segments();
        self.read().committed.segment_metas()
    }
}
