use std::collections::HashSet;
use std::io::Write;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::thread;

use log::{debug, error, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::segment_manager::SegmentManager;
use crate::common::errors::SearchError;
use crate::directory::{Directory, GarbageCollectionResult};
use crate::future_result::FutureResult;
use crate::index::codec::{Codec, DefaultCodec, SegmentData};
use crate::index::{Index, IndexMeta, Segment, SegmentId, SegmentMeta};
use crate::indexer::deletion_policy::DeletionPolicyTracker;
use crate::indexer::merge_operation::MergeOperationInventory;
use crate::indexer::merger::IndexMerger;
use crate::indexer::persister::Persister;
use crate::indexer::segment_manager::SegmentsStatus;
use crate::indexer::stamper::Stamper;
use crate::indexer::{DefaultMergePolicy, MergeCandidate, MergeOperation, MergePolicy, SegmentEntry};
use crate::{Opstamp, META_FILEPATH};

const NUM_MERGE_THREADS: usize = 4;

/// Serializes `metas` to `meta.json`, replacing the previous version
/// atomically.
pub fn save_metas(metas: &IndexMeta, directory: &dyn Directory) -> crate::Result<()> {
    let mut buffer = serde_json::to_vec_pretty(metas)?;
    writeln!(&mut buffer)?;
    directory.sync_directory()?;
    directory.atomic_write(&META_FILEPATH, &buffer[..])?;
    debug!(
        "[{}] saved meta: segments={}, opstamp={}, payload={:?}",
        thread::current().name().unwrap_or_default(),
        metas.segments.len(),
        metas.opstamp,
        metas.payload
    );
    Ok(())
}

/// Owns every segment-lifecycle operation: adding freshly flushed segments,
/// committing, merging, garbage collection, serialized through a
/// single-thread pool so none of them race each other. Merges themselves run
/// on a separate pool since they can take a while and shouldn't block the
/// next commit.
#[derive(Clone)]
pub(crate) struct SegmentUpdater(Arc<InnerSegmentUpdater>);

pub(crate) struct InnerSegmentUpdater {
    active_index_meta: RwLock<Arc<IndexMeta>>,
    pool: ThreadPool,
    merge_thread_pool: ThreadPool,
    index: Index,
    segment_manager: SegmentManager,
    merge_policy: RwLock<Arc<dyn MergePolicy>>,
    killed: AtomicBool,
    stamper: Stamper,
    merge_operations: MergeOperationInventory,
    deletion_policy: DeletionPolicyTracker,
    persister: Persister,
}

impl Deref for SegmentUpdater {
    type Target = InnerSegmentUpdater;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn garbage_collect_files(segment_updater: SegmentUpdater) -> GarbageCollectionResult {
    info!(
        "[{}] running GC over {} files",
        thread::current().name().unwrap_or_default(),
        segment_updater.list_files().len()
    );
    let mut index = segment_updater.index.clone();
    index.directory_mut().garbage_collect(move || segment_updater.list_files())
}

/// Merges `segment_entries` into a brand new segment, written synchronously
/// to the index's directory. Runs in the calling (merge pool) thread and is
/// computationally expensive.
fn merge(index: &Index, segment_entries: Vec<SegmentEntry>) -> crate::Result<Option<SegmentEntry>> {
    let total_docs = segment_entries.iter().map(|entry| entry.alive_num_docs() as u64).sum::<u64>();
    if total_docs == 0 {
        return Ok(None);
    }

    let merged_segment = index.new_segment();
    info!(
        "[merge] merging {} segments ({} alive docs) into {}",
        segment_entries.len(),
        total_docs,
        merged_segment.id()
    );

    let merger = IndexMerger::open(index, &segment_entries)?;
    let data = merger.merge()?;
    let num_docs = data.num_docs;

    DefaultCodec.write_segment(index.directory(), merged_segment.id(), &data)?;

    let meta = index.new_segment_meta(merged_segment.id(), num_docs);
    debug!(
        "[merge] {:?} -> {} ({} docs)",
        segment_entries.iter().map(|entry| entry.segment_id()).collect::<Vec<_>>(),
        meta.id(),
        num_docs
    );
    Ok(Some(SegmentEntry::new(meta, None)))
}

impl SegmentUpdater {
    pub fn create(index: Index, stamper: Stamper) -> crate::Result<SegmentUpdater> {
        let segments: Vec<SegmentMeta> = index.searchable_segment_metas()?;
        debug!("[create] loaded {} segment metas", segments.len());

        let segment_manager = SegmentManager::from_segments(segments);

        let pool: ThreadPool = ThreadPoolBuilder::new()
            .thread_name(|_| "vellum-seg-updater".to_string())
            .num_threads(1)
            .build()
            .map_err(|_| SearchError::SystemError("failed to spawn segment updater thread".to_string()))?;

        let merge_thread_pool: ThreadPool = ThreadPoolBuilder::new()
            .thread_name(|i| format!("vellum-merge-{i}"))
            .num_threads(NUM_MERGE_THREADS)
            .build()
            .map_err(|_| SearchError::SystemError("failed to spawn segment merging thread".to_string()))?;

        let index_meta: IndexMeta = index.load_metas()?;
        let settings = index.index_settings();
        let num_snapshots_to_keep = settings.config.num_snapshots_to_keep;

        let persist_directory: Arc<dyn Directory> = Arc::new(index.directory().clone());
        let persist_codec: Arc<dyn Codec> = Arc::new(DefaultCodec);
        let persist_index = index.clone();

        let inner = Arc::new_cyclic(|weak: &Weak<InnerSegmentUpdater>| {
            let weak = weak.clone();
            let persister = Persister::start(persist_directory, persist_codec, settings.config, move |segment_id, num_docs, _paths| {
                let Some(inner) = weak.upgrade() else { return };
                let meta = persist_index.new_segment_meta(segment_id, num_docs);
                let segment_updater = SegmentUpdater(inner);
                segment_updater.segment_manager.add_segment(SegmentEntry::new(meta, None));
                segment_updater.consider_merge_options();
            });

            InnerSegmentUpdater {
                active_index_meta: RwLock::new(Arc::new(index_meta)),
                pool,
                merge_thread_pool,
                index,
                segment_manager,
                merge_policy: RwLock::new(Arc::new(DefaultMergePolicy::default())),
                killed: AtomicBool::new(false),
                stamper,
                merge_operations: Default::default(),
                deletion_policy: DeletionPolicyTracker::new(Box::new(
                    crate::indexer::deletion_policy::KeepNLatestDeletionPolicy::new(num_snapshots_to_keep),
                )),
                persister,
            }
        });

        Ok(SegmentUpdater(inner))
    }

    /// Hands `data` off to the persister thread; returns as soon as it is
    /// queued, well before the segment is durable. `schedule_add_segment`
    /// only runs once the persister reports the write complete.
    pub(crate) fn submit_segment(&self, segment_id: SegmentId, data: SegmentData) -> crate::Result<()> {
        self.persister.submit(segment_id, data)
    }

    pub fn get_merge_policy(&self) -> Arc<dyn MergePolicy> {
        self.merge_policy.read().unwrap().clone()
    }

    pub fn set_merge_policy(&self, merge_policy: Box<dyn MergePolicy>) {
        *self.merge_policy.write().unwrap() = Arc::from(merge_policy);
    }

    /// Runs `task` on the single-thread segment-updater pool.
    fn schedule_task<T: 'static + Send, F: FnOnce() -> crate::Result<T> + 'static + Send>(&self, task: F) -> FutureResult<T> {
        if !self.is_alive() {
            return SearchError::Closed.into();
        }
        let (scheduled_result, sender) = FutureResult::create("a segment_updater task panicked; this should never happen");
        self.pool.spawn(|| {
            let task_result = task();
            let _ = sender.send(task_result);
        });
        scheduled_result
    }

    pub fn schedule_add_segment(&self, segment_entry: SegmentEntry) -> FutureResult<()> {
        info!(
            "[{}] adding segment {}",
            thread::current().name().unwrap_or_default(),
            segment_entry.segment_id()
        );
        let segment_updater = self.clone();
        self.schedule_task(move || {
            segment_updater.segment_manager.add_segment(segment_entry);
            segment_updater.consider_merge_options();
            Ok(())
        })
    }

    pub(crate) fn remove_all_segments(&self) {
        self.segment_manager.remove_all_segments();
    }

    /// Applies a term delete synchronously against every segment currently
    /// tracked by the segment manager, committed or not.
    pub(crate) fn apply_term_delete(&self, field: &str, term: &[u8]) -> crate::Result<()> {
        self.segment_manager.apply_term_delete(&self.index, field, term)
    }

    pub fn kill(&mut self) {
        self.killed.store(true, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        !self.killed.load(Ordering::Acquire)
    }

    pub fn save_metas(&self, opstamp: Opstamp, commit_message: Option<String>) -> crate::Result<()> {
        if !self.is_alive() {
            return Ok(());
        }
        let directory = self.index.directory();
        let mut committed_segment_metas = self.segment_manager.committed_segment_metas();
        committed_segment_metas.sort_by_key(|meta| std::cmp::Reverse(meta.num_docs()));

        let index_meta = IndexMeta { segments: committed_segment_metas, opstamp, payload: commit_message };
        save_metas(&index_meta, directory)?;
        self.deletion_policy.register_commit(index_meta.clone());
        self.store_meta(&index_meta);
        Ok(())
    }

    pub fn schedule_garbage_collect(&self) -> FutureResult<GarbageCollectionResult> {
        info!("[{}] scheduling garbage collection", thread::current().name().unwrap_or_default());
        let self_clone = self.clone();
        self.schedule_task(move || Ok(garbage_collect_files(self_clone)))
    }

    /// Every file presently referenced by a live `SegmentMeta` plus
    /// `meta.json`; anything else the `ManagedDirectory` knows about is
    /// fair game for GC.
    fn list_files(&self) -> HashSet<PathBuf> {
        let mut files: HashSet<PathBuf> =
            self.index.list_all_segment_metas().into_iter().flat_map(|meta| meta.list_files()).collect();
        files.insert(META_FILEPATH.to_path_buf());
        files
    }

    pub(crate) fn schedule_commit(&self, opstamp: Opstamp, payload: Option<String>) -> FutureResult<Opstamp> {
        let segment_updater = self.clone();
        self.schedule_task(move || {
            info!("[{}] committing at opstamp {}", thread::current().name().unwrap_or_default(), opstamp);
            segment_updater.persister.wait_until_drained()?;
            let segment_entries = segment_updater.segment_manager.segment_entries();
            segment_updater.segment_manager.commit(segment_entries);
            segment_updater.save_metas(opstamp, payload)?;
            let _ = garbage_collect_files(segment_updater.clone());
            segment_updater.consider_merge_options();
            Ok(opstamp)
        })
    }

    fn store_meta(&self, index_meta: &IndexMeta) {
        *self.active_index_meta.write().unwrap() = Arc::new(index_meta.clone());
    }

    fn load_meta(&self) -> Arc<IndexMeta> {
        self.active_index_meta.read().unwrap().clone()
    }

    pub(crate) fn make_merge_operation(&self, segment_ids: &[SegmentId]) -> MergeOperation {
        let commit_opstamp = self.load_meta().opstamp;
        MergeOperation::new(&self.merge_operations, commit_opstamp, segment_ids.to_vec())
    }

    /// Starts `merge_operation` on the merge pool. Blocks only until the
    /// segment manager hands back the segments to merge, not until the merge
    /// itself finishes.
    pub fn start_merge(&self, merge_operation: MergeOperation) -> FutureResult<Option<SegmentMeta>> {
        assert!(!merge_operation.segment_ids().is_empty(), "segment_ids cannot be empty");

        let segment_updater = self.clone();
        let segment_entries: Vec<SegmentEntry> = match self.segment_manager.start_merge(merge_operation.segment_ids()) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("merge could not start, this is not fatal: {err}");
                return err.into();
            }
        };
        info!("[start_merge] segments: {segment_entries:?}");

        let (scheduled_result, merging_future_send) = FutureResult::create("merge operation failed");

        self.merge_thread_pool.spawn(move || {
            info!(
                "[{}] merging {} segments: {:?}",
                thread::current().name().unwrap_or_default(),
                merge_operation.segment_ids().len(),
                merge_operation.segment_ids()
            );
            match merge(&segment_updater.index, segment_entries) {
                Ok(after_merge_segment_entry) => {
                    let res = segment_updater.end_merge(merge_operation, after_merge_segment_entry);
                    let _ = merging_future_send.send(res);
                }
                Err(merge_error) => {
                    warn!("merge of {:?} was cancelled: {:?}", merge_operation.segment_ids().to_vec(), merge_error);
                    let _ = merging_future_send.send(Err(merge_error));
                }
            }
        });

        scheduled_result
    }

    pub(crate) fn get_mergeable_segments(&self) -> (Vec<SegmentEntry>, Vec<SegmentEntry>) {
        let merge_segment_ids: HashSet<SegmentId> = self.merge_operations.segment_in_merge();
        self.segment_manager.get_mergeable_segments(&merge_segment_ids)
    }

    fn consider_merge_options(&self) {
        let (committed_segments, uncommitted_segments) = self.get_mergeable_segments();
        debug!(
            "[{}] considering merges: committed={}, uncommitted={}",
            thread::current().name().unwrap_or_default(),
            committed_segments.len(),
            uncommitted_segments.len()
        );

        let merge_policy = self.get_merge_policy();

        let current_opstamp = self.stamper.stamp();
        let mut merge_candidates: Vec<MergeOperation> = merge_policy
            .compute_merge_candidates(&uncommitted_segments)
            .into_iter()
            .map(|candidate: MergeCandidate| MergeOperation::new(&self.merge_operations, current_opstamp, candidate.0))
            .collect();

        let commit_opstamp = self.load_meta().opstamp;
        let committed_merge_candidates = merge_policy
            .compute_merge_candidates(&committed_segments)
            .into_iter()
            .map(|candidate: MergeCandidate| MergeOperation::new(&self.merge_operations, commit_opstamp, candidate.0));
        merge_candidates.extend(committed_merge_candidates);

        debug!("[consider_merge_options] {} candidates", merge_candidates.len());
        for merge_operation in merge_candidates {
            drop(self.start_merge(merge_operation));
        }
    }

    /// Queues an `end_merge` task and blocks until it runs.
    fn end_merge(
        &self,
        merge_operation: MergeOperation,
        after_merge_segment_entry: Option<SegmentEntry>,
    ) -> crate::Result<Option<SegmentMeta>> {
        let segment_updater = self.clone();
        let after_merge_segment_meta = after_merge_segment_entry.as_ref().map(|entry| entry.meta().clone());

        self.schedule_task(move || {
            info!(
                "[{}] ending merge for {:?}",
                thread::current().name().unwrap_or_default(),
                after_merge_segment_entry.as_ref().map(|entry| entry.meta())
            );
            let previous_metas = segment_updater.load_meta();
            let segments_status: SegmentsStatus =
                segment_updater.segment_manager.end_merge(merge_operation.segment_ids(), after_merge_segment_entry)?;

            if segments_status == SegmentsStatus::Committed {
                segment_updater.save_metas(previous_metas.opstamp, previous_metas.payload.clone())?;
            }
            segment_updater.consider_merge_options();

            let _ = garbage_collect_files(segment_updater);
            Ok(())
        })
        .wait()?;
        Ok(after_merge_segment_meta)
    }

    /// Blocks until no merge is in flight. Not required for correctness:
    /// dropping the `IndexWriter` mid-merge is safe, the directory GC
    /// eventually reclaims whatever the abandoned merge produced.
    pub fn wait_merging_thread(&self) -> crate::Result<()> {
        self.merge_operations.wait_until_empty();
        Ok(())
    }
}
