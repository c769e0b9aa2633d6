use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::index::IndexMeta;

/// Decides which past `IndexMeta` snapshots are still worth keeping around
/// on disk. The `ManagedDirectory` garbage collector only ever deletes files
/// that no snapshot returned by `snapshots()` still references.
pub trait DeletionPolicy: Send + Sync + 'static {
    /// Called after every successful commit with the full history of
    /// metas committed so far, oldest first. Returns the subset that must
    /// be preserved.
    fn snapshots(&self, history: &[Arc<IndexMeta>]) -> Vec<Arc<IndexMeta>>;
}

/// Keeps only the `num_to_keep` most recent commits' segments alive; this is
/// the default, matching `IndexConfig::num_snapshots_to_keep`.
pub struct KeepNLatestDeletionPolicy {
    num_to_keep: usize,
}

impl KeepNLatestDeletionPolicy {
    pub fn new(num_to_keep: usize) -> KeepNLatestDeletionPolicy {
        KeepNLatestDeletionPolicy { num_to_keep: num_to_keep.max(1) }
    }
}

impl DeletionPolicy for KeepNLatestDeletionPolicy {
    fn snapshots(&self, history: &[Arc<IndexMeta>]) -> Vec<Arc<IndexMeta>> {
        let start = history.len().saturating_sub(self.num_to_keep);
        history[start..].to_vec()
    }
}

/// Tracks the history of committed metas and exposes the set of segment ids
/// currently protected by the active `DeletionPolicy`.
pub struct DeletionPolicyTracker {
    policy: Box<dyn DeletionPolicy>,
    history: RwLock<Vec<Arc<IndexMeta>>>,
}

impl DeletionPolicyTracker {
    pub fn new(policy: Box<dyn DeletionPolicy>) -> DeletionPolicyTracker {
        DeletionPolicyTracker { policy, history: RwLock::new(Vec::new()) }
    }

    pub fn register_commit(&self, meta: IndexMeta) {
        self.history.write().expect("lock poisoned").push(Arc::new(meta));
    }

    pub fn protected_segment_ids(&self) -> HashSet<crate::index::SegmentId> {
        let history = self.history.read().expect("lock poisoned");
        self.policy
            .snapshots(&history)
            .iter()
            .flat_map(|meta| meta.segments.iter().map(|s| s.id()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_n_latest_trims_history() {
        let policy = KeepNLatestDeletionPolicy::new(2);
        let history: Vec<Arc<IndexMeta>> = (0..5)
            .map(|i| Arc::new(IndexMeta { segments: vec![], opstamp: i, payload: None }))
            .collect();
        let kept = policy.snapshots(&history);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].opstamp, 3);
        assert_eq!(kept[1].opstamp, 4);
    }
}
