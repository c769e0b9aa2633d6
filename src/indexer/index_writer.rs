use std::ops::Range;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use log::{debug, error, info, trace};
use smallvec::smallvec;

use super::operation::{AddOperation, DeleteOperation, UserOperation};
use super::segment_updater::SegmentUpdater;
use super::{AddBatch, AddBatchReceiver, AddBatchSender, PreparedCommit};
use crate::common::errors::SearchError;
use crate::directory::{DirectoryLock, GarbageCollectionResult};
use crate::future_result::FutureResult;
use crate::index::schema::{AnalyzedField, Document};
use crate::index::{Index, Segment, SegmentId, SegmentMeta};
use crate::indexer::index_writer_status::IndexWriterStatus;
use crate::indexer::stamper::Stamper;
use crate::indexer::{MergePolicy, SegmentEntry, SegmentWriter};
use crate::Opstamp;

/// Once an indexing thread's in-memory segment has less than this much
/// headroom left in its budget, it stops accepting documents and flushes.
pub const MARGIN_IN_BYTES: usize = 1_000_000;

/// Minimum per-thread memory budget; below this a segment would flush too
/// often to be worth building.
pub const MEMORY_BUDGET_NUM_BYTES_MIN: usize = (MARGIN_IN_BYTES as u32 * 15u32) as usize;
/// Maximum per-thread memory budget; doc ids are `u32`, so a segment can't
/// meaningfully exceed that range of bytes either.
pub const MEMORY_BUDGET_NUM_BYTES_MAX: usize = u32::MAX as usize - MARGIN_IN_BYTES;

/// More indexing threads than this rarely helps and wastes memory budget.
pub const MAX_NUM_THREAD: usize = 8;

/// `add_document` blocks once this many documents are queued but not yet
/// picked up by an indexing worker.
const PIPELINE_MAX_SIZE_IN_DOCS: usize = 10_000;

fn error_in_index_worker_thread(context: &str) -> SearchError {
    SearchError::ErrorInThread(format!("{context}. A worker thread encountered an error or panicked."))
}

/// Adds documents to an `Index`.
///
/// `IndexWriter` owns a handful of indexing worker threads and a shared,
/// bounded channel feeding them batches of documents. Each worker builds its
/// own `SegmentWriter`, flushing it into a brand new segment once its memory
/// budget is exhausted or a commit cuts the channel.
pub struct IndexWriter {
    _directory_lock: Option<DirectoryLock>,

    index: Index,

    memory_budget_in_bytes_per_thread: usize,

    workers_join_handle: Vec<JoinHandle<crate::Result<()>>>,

    index_writer_status: IndexWriterStatus,

    operation_sender: AddBatchSender,

    segment_updater: SegmentUpdater,

    worker_id: usize,

    num_threads: usize,

    stamper: Stamper,
    committed_opstamp: Opstamp,
}

/// Drains `grouped_add_iterator` into `segment`, flushing once its budget is
/// exhausted or the channel runs dry, then hands the finished segment off to
/// `segment_updater`'s persister for an asynchronous write.
fn index_documents(
    memory_budget: usize,
    segment: Segment,
    grouped_add_iterator: &mut dyn Iterator<Item = AddBatch>,
    segment_updater: &SegmentUpdater,
) -> crate::Result<()> {
    info!("[{}] indexing into segment {}", thread::current().name().unwrap_or_default(), segment.id());
    let mut segment_writer = SegmentWriter::for_segment(memory_budget, segment.clone())?;

    for batch in grouped_add_iterator {
        for add_operation in batch {
            trace!(
                "[{}] indexing doc at opstamp {}",
                thread::current().name().unwrap_or_default(),
                add_operation.opstamp
            );
            segment_writer.index_document(add_operation)?;
        }
        let mem_usage = segment_writer.mem_usage();
        if mem_usage >= memory_budget - MARGIN_IN_BYTES {
            info!(
                "[{}] memory budget reached, flushing segment {} with {} docs",
                thread::current().name().unwrap_or_default(),
                segment.id(),
                segment_writer.num_docs()
            );
            break;
        }
    }

    if !segment_updater.is_alive() {
        return Ok(());
    }

    let num_docs = segment_writer.num_docs();
    assert!(num_docs > 0, "the worker should not be started without at least one pending document");

    let data = segment_writer.finalize()?;
    segment_updater.submit_segment(segment.id(), data)?;
    Ok(())
}

impl IndexWriter {
    pub(crate) fn new(
        index: &Index,
        num_threads: usize,
        memory_budget_in_bytes_per_thread: usize,
        directory_lock: DirectoryLock,
    ) -> crate::Result<Self> {
        if memory_budget_in_bytes_per_thread < MEMORY_BUDGET_NUM_BYTES_MIN {
            return Err(SearchError::InvalidConfig(format!(
                "memory arena per thread must be at least {MEMORY_BUDGET_NUM_BYTES_MIN} bytes"
            )));
        }
        if memory_budget_in_bytes_per_thread >= MEMORY_BUDGET_NUM_BYTES_MAX {
            return Err(SearchError::InvalidConfig(format!(
                "memory arena per thread cannot exceed {MEMORY_BUDGET_NUM_BYTES_MAX} bytes"
            )));
        }
        let (document_sender, document_receiver) = crossbeam_channel::bounded(PIPELINE_MAX_SIZE_IN_DOCS);

        let current_opstamp = index.load_metas()?.opstamp;
        let stamper = Stamper::new(current_opstamp);
        let segment_updater = SegmentUpdater::create(index.clone(), stamper.clone())?;

        let mut index_writer = Self {
            _directory_lock: Some(directory_lock),
            memory_budget_in_bytes_per_thread,
            index: index.clone(),
            index_writer_status: IndexWriterStatus::from(document_receiver),
            operation_sender: document_sender,
            segment_updater,
            workers_join_handle: vec![],
            num_threads,
            committed_opstamp: current_opstamp,
            stamper,
            worker_id: 0,
        };
        index_writer.start_workers()?;
        Ok(index_writer)
    }

    fn drop_sender(&mut self) {
        let (sender, _receiver) = crossbeam_channel::bounded(1);
        self.operation_sender = sender;
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Blocks until every indexing worker and in-flight merge has finished.
    /// Consumes `self`, since nothing can be added afterwards.
    pub fn wait_merging_threads(mut self) -> crate::Result<()> {
        self.drop_sender();

        let former_workers_handles = std::mem::take(&mut self.workers_join_handle);
        for join_handle in former_workers_handles {
            join_handle
                .join()
                .map_err(|_| error_in_index_worker_thread("worker thread panicked"))?
                .map_err(|_| error_in_index_worker_thread("worker thread failed"))?;
        }

        let result = self.segment_updater.wait_merging_thread();
        if let Err(ref e) = result {
            error!("a merging thread failed: {e:?}");
        }
        result
    }

    #[doc(hidden)]
    pub fn add_segment(&self, segment_meta: SegmentMeta) -> crate::Result<()> {
        let segment_entry = SegmentEntry::new(segment_meta, None);
        self.segment_updater.schedule_add_segment(segment_entry).wait()
    }

    /// Creates a new segment. Useful only for advanced use cases like
    /// converting another index format into this one.
    pub fn new_segment(&self) -> Segment {
        self.index.new_segment()
    }

    fn operation_receiver(&self) -> crate::Result<AddBatchReceiver> {
        self.index_writer_status.operation_receiver().ok_or_else(|| {
            SearchError::ErrorInThread(
                "the index writer was killed, likely because a worker thread hit an io error".to_string(),
            )
        })
    }

    fn add_indexing_worker(&mut self) -> crate::Result<()> {
        let document_receiver_clone = self.operation_receiver()?;
        let index_writer_bomb = self.index_writer_status.create_bomb();
        let segment_updater = self.segment_updater.clone();
        let mem_budget = self.memory_budget_in_bytes_per_thread;
        let index = self.index.clone();

        let join_handle: JoinHandle<crate::Result<()>> = thread::Builder::new()
            .name(format!("vellum-index-{}", self.worker_id))
            .spawn(move || loop {
                let mut document_iterator =
                    document_receiver_clone.clone().into_iter().filter(|batch: &AddBatch| !batch.is_empty()).peekable();

                if document_iterator.peek().is_none() {
                    index_writer_bomb.defuse();
                    return Ok(());
                }

                index_documents(mem_budget, index.new_segment(), &mut document_iterator, &segment_updater)?;
            })?;
        self.worker_id += 1;
        self.workers_join_handle.push(join_handle);
        Ok(())
    }

    pub fn get_merge_policy(&self) -> Arc<dyn MergePolicy> {
        self.segment_updater.get_merge_policy()
    }

    pub fn set_merge_policy(&self, merge_policy: Box<dyn MergePolicy>) {
        self.segment_updater.set_merge_policy(merge_policy);
    }

    fn start_workers(&mut self) -> crate::Result<()> {
        for _ in 0..self.num_threads {
            self.add_indexing_worker()?;
        }
        Ok(())
    }

    /// Detects and removes files that are no longer referenced by any live
    /// segment meta.
    pub fn garbage_collect_files(&self) -> FutureResult<GarbageCollectionResult> {
        self.segment_updater.schedule_garbage_collect()
    }

    /// Deletes every document in the index.
    pub fn delete_all_documents(&self) -> crate::Result<Opstamp> {
        self.segment_updater.remove_all_segments();
        self.stamper.revert(self.committed_opstamp);
        Ok(self.committed_opstamp)
    }

    /// Deletes every doc whose `field` holds `term`, across every segment
    /// currently tracked (committed or not). See
    /// `SegmentRegister::apply_term_delete` for the ordering caveat against
    /// concurrent adds.
    pub fn delete_term(&self, field: &str, term: &[u8]) -> crate::Result<Opstamp> {
        let opstamp = self.stamper.stamp();
        self.segment_updater.apply_term_delete(field, term)?;
        Ok(opstamp)
    }

    /// Merges `segment_ids` and returns the new `SegmentMeta`.
    pub fn merge(&mut self, segment_ids: &[SegmentId]) -> FutureResult<Option<SegmentMeta>> {
        let merge_operation = self.segment_updater.make_merge_operation(segment_ids);
        let segment_updater = self.segment_updater.clone();
        segment_updater.start_merge(merge_operation)
    }

    fn recreate_document_channel(&mut self) {
        let (document_sender, document_receiver) = crossbeam_channel::bounded(PIPELINE_MAX_SIZE_IN_DOCS);
        self.operation_sender = document_sender;
        self.index_writer_status = IndexWriterStatus::from(document_receiver);
    }

    /// Rolls back to the last commit, discarding every uncommitted change.
    pub fn rollback(&mut self) -> crate::Result<Opstamp> {
        info!("rolling back to opstamp {}", self.committed_opstamp);
        self.segment_updater.kill();
        let document_receiver_res = self.operation_receiver();

        let directory_lock =
            self._directory_lock.take().expect("the IndexWriter should always hold its directory lock");

        let new_index_writer =
            IndexWriter::new(&self.index, self.num_threads, self.memory_budget_in_bytes_per_thread, directory_lock)?;

        *self = new_index_writer;

        if let Ok(document_receiver) = document_receiver_res {
            for _ in document_receiver {}
        }

        Ok(self.committed_opstamp)
    }

    /// Cuts the indexing queue: pending documents are flushed to their
    /// indexing workers, which then terminate and persist their segment.
    /// Returns a `PreparedCommit` the caller must `.commit()` or `.abort()`.
    pub fn prepare_commit(&mut self) -> crate::Result<PreparedCommit> {
        info!("[{}] preparing commit", thread::current().name().unwrap_or_default());

        self.recreate_document_channel();

        let former_workers_join_handle = std::mem::take(&mut self.workers_join_handle);
        for worker_handle in former_workers_join_handle {
            let indexing_worker_result =
                worker_handle.join().map_err(|e| SearchError::ErrorInThread(format!("{e:?}")))?;
            indexing_worker_result?;
            self.add_indexing_worker()?;
        }

        let commit_opstamp = self.stamper.stamp();
        Ok(PreparedCommit::new(self, commit_opstamp))
    }

    /// Commits every pending change. Blocks until they are persisted and
    /// visible to new `Searcher`s.
    pub fn commit(&mut self) -> crate::Result<Opstamp> {
        self.prepare_commit()?.commit()
    }

    pub(crate) fn segment_updater(&self) -> &SegmentUpdater {
        &self.segment_updater
    }

    pub(crate) fn set_committed_opstamp(&mut self, opstamp: Opstamp) {
        self.committed_opstamp = opstamp;
    }

    /// The opstamp of the last successful commit, what `rollback` returns
    /// to, and what is currently visible to searchers.
    pub fn commit_opstamp(&self) -> Opstamp {
        self.committed_opstamp
    }

    /// Adds one document. May block if the indexing pipeline is full.
    pub fn add_document(&self, document: Document, analyzed_fields: Vec<AnalyzedField>) -> crate::Result<Opstamp> {
        let opstamp = self.stamper.stamp();
        self.send_add_documents_batch(smallvec![AddOperation { opstamp, document, analyzed_fields }])?;
        Ok(opstamp)
    }

    fn get_batch_opstamps(&self, count: Opstamp) -> (Opstamp, Range<Opstamp>) {
        let Range { start, end } = self.stamper.stamps(count + 1u64);
        let last_opstamp = end - 1;
        (last_opstamp, start..last_opstamp)
    }

    /// Runs a batch of add/delete operations, assigning each a sequential
    /// opstamp and the batch itself the next one after. Deletes are applied
    /// synchronously as they're seen; adds are batched together so they land
    /// in the same segment. Changes are only visible to searchers after the
    /// next `commit()`.
    pub fn run<I>(&self, user_operations: I) -> crate::Result<Opstamp>
    where
        I: IntoIterator<Item = UserOperation>,
        I::IntoIter: ExactSizeIterator,
    {
        let user_operations_it = user_operations.into_iter();
        let count = user_operations_it.len() as u64;
        if count == 0 {
            return Ok(self.stamper.stamp());
        }
        let (batch_opstamp, stamps) = self.get_batch_opstamps(count);

        let mut adds = AddBatch::default();

        for (user_op, opstamp) in user_operations_it.zip(stamps) {
            match user_op {
                UserOperation::Add(document, analyzed_fields) => {
                    adds.push(AddOperation { opstamp, document, analyzed_fields });
                }
                UserOperation::Delete { field, term } => {
                    self.segment_updater.apply_term_delete(&field, &term)?;
                    let _ = DeleteOperation { opstamp, field, term };
                }
            }
        }
        self.send_add_documents_batch(adds)?;
        Ok(batch_opstamp)
    }

    fn send_add_documents_batch(&self, add_ops: AddBatch) -> crate::Result<()> {
        if self.index_writer_status.is_alive() && self.operation_sender.send(add_ops).is_ok() {
            Ok(())
        } else {
            Err(error_in_index_worker_thread("the index writer was killed"))
        }
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        self.segment_updater.kill();
        self.drop_sender();
        for worker in self.workers_join_handle.drain(..) {
            let _ = worker.join();
        }
    }
}
