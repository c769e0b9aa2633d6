use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables the embedder may set on an [`Index`](crate::index::Index) or
/// [`IndexWriter`](crate::indexer::IndexWriter). Every field has a default
/// matching what was previously a hard-coded constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// How long the persister sleeps between flush attempts when there is
    /// little work queued.
    pub persister_nap_time_msec: u64,
    /// The persister skips napping once more than this many in-memory
    /// segments are queued, flushing immediately instead.
    pub persister_nap_under_num_files: usize,
    /// If at least this many small in-memory segments are queued, the
    /// persister merges them before flushing rather than writing each one
    /// out separately.
    pub min_segments_for_in_memory_merge: usize,
    /// Default number of most recent snapshot epochs a `DeletionPolicy`
    /// keeps alive.
    pub num_snapshots_to_keep: usize,
    /// Bound on concurrent `MultiSearch` fan-out.
    pub multi_search_concurrency: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            persister_nap_time_msec: 500,
            persister_nap_under_num_files: 8,
            min_segments_for_in_memory_merge: 4,
            num_snapshots_to_keep: 1,
            multi_search_concurrency: 1000,
        }
    }
}

impl IndexConfig {
    pub fn persister_nap_time(&self) -> Duration {
        Duration::from_millis(self.persister_nap_time_msec)
    }
}
