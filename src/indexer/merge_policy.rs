use std::fmt;

use crate::index::SegmentId;
use crate::indexer::segment_entry::SegmentEntry;

/// A set of segments a `MergePolicy` proposes merging into one.
#[derive(Debug, Clone)]
pub struct MergeCandidate(pub Vec<SegmentId>);

/// Decides which segments should be merged together, given the full set of
/// segments not already part of a running merge.
pub trait MergePolicy: fmt::Debug + Send + Sync {
    fn compute_merge_candidates(&self, segments: &[SegmentEntry]) -> Vec<MergeCandidate>;
}

/// Never merges anything. Useful for tests and for workloads that manage
/// merging externally.
#[derive(Debug, Clone, Default)]
pub struct NoMergePolicy;

impl MergePolicy for NoMergePolicy {
    fn compute_merge_candidates(&self, _segments: &[SegmentEntry]) -> Vec<MergeCandidate> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_merge_policy_never_merges() {
        let policy = NoMergePolicy;
        assert!(policy.compute_merge_candidates(&[]).is_empty());
    }
}
