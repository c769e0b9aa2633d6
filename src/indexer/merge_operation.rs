use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use census::{Inventory, TrackedObject};

use crate::index::SegmentId;
use crate::Opstamp;

/// Tracks in-flight merges. As long as a `MergeOperation` is alive, its
/// segment ids are excluded from `SegmentRegister::get_mergeable_segments`,
/// so the same segment is never proposed for two concurrent merges.
#[derive(Default, Clone)]
pub(crate) struct MergeOperationInventory(Inventory<InnerMergeOperation>);

impl MergeOperationInventory {
    /// Every segment id currently part of a running merge.
    pub fn segment_in_merge(&self) -> HashSet<SegmentId> {
        self.0.list().iter().flat_map(|op| op.segment_ids.iter().cloned()).collect()
    }

    /// Blocks until no merge is in flight. Used by `wait_merging_thread`.
    pub fn wait_until_empty(&self) {
        while !self.0.list().is_empty() {
            thread::sleep(Duration::from_millis(10));
        }
    }
}

struct InnerMergeOperation {
    target_opstamp: Opstamp,
    segment_ids: Vec<SegmentId>,
}

/// A planned merge of a fixed set of segments, alive for the duration of the
/// merge; dropping it releases those segments back to future merge planning.
#[derive(Clone)]
pub struct MergeOperation {
    target_opstamp: Opstamp,
    inner: TrackedObject<InnerMergeOperation>,
}

impl MergeOperation {
    pub(crate) fn new(
        inventory: &MergeOperationInventory,
        target_opstamp: Opstamp,
        segment_ids: Vec<SegmentId>,
    ) -> MergeOperation {
        let inner = inventory.0.track(InnerMergeOperation { target_opstamp, segment_ids });
        MergeOperation { target_opstamp, inner }
    }

    pub fn segment_ids(&self) -> &[SegmentId] {
        &self.inner.segment_ids[..]
    }

    pub fn target_opstamp(&self) -> Opstamp {
        self.target_opstamp
    }
}
