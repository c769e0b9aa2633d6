use arc_swap::ArcSwap;
use census::{Inventory, TrackedObject};
use log::error;
use std::convert::TryInto;
use std::sync::atomic::AtomicU64;
use std::sync::{atomic, Arc, Weak};

use crate::common::errors::SearchError;
use crate::directory::{Directory, WatchCallback, WatchHandle, META_LOCK};
use crate::index::{Index, SegmentReader};

use super::warming::WarmingState;
use super::Warmer;
use super::{Searcher, SearcherGeneration, SearcherInner};

/// Controls when `IndexReader` picks up a new commit.
#[derive(Clone, Copy)]
pub enum ReloadPolicy {
    /// Reloads only happen when `IndexReader::reload` is called explicitly.
    Manual,
    /// The reader watches the directory and reloads within a few
    /// milliseconds of a new commit becoming visible.
    OnCommitWithDelay,
}

/// Builds an [`IndexReader`].
///
/// Lets you configure the [`ReloadPolicy`], register [`Warmer`]s, and size
/// the thread pool used to run them.
#[derive(Clone)]
pub struct IndexReaderBuilder {
    reload_policy: ReloadPolicy,
    index: Index,
    warmers: Vec<Weak<dyn Warmer>>,
    num_warming_threads: usize,
}

impl IndexReaderBuilder {
    #[must_use]
    pub(crate) fn new(index: Index) -> IndexReaderBuilder {
        IndexReaderBuilder { reload_policy: ReloadPolicy::OnCommitWithDelay, index, warmers: Vec::new(), num_warming_threads: 1 }
    }

    /// Builds the reader. Opens a `SegmentReader` per searchable segment, so
    /// this can take a while on a large index.
    pub fn try_into(self) -> crate::Result<IndexReader> {
        let searcher_generation_inventory = Inventory::default();
        let warming_state = WarmingState::new(self.num_warming_threads, self.warmers, searcher_generation_inventory.clone())?;
        let inner_reader = InnerIndexReader::new(self.index, warming_state, searcher_generation_inventory)?;
        let inner_reader_arc = Arc::new(inner_reader);
        let watch_handle_opt: Option<WatchHandle> = match self.reload_policy {
            ReloadPolicy::Manual => None,
            ReloadPolicy::OnCommitWithDelay => {
                let inner_reader_arc_clone = inner_reader_arc.clone();
                let callback = move || {
                    if let Err(err) = inner_reader_arc_clone.reload() {
                        error!("error reloading searcher after a commit was detected: {err:?}");
                    }
                };
                let watch_handle = inner_reader_arc.index.directory().watch(WatchCallback::new(callback))?;
                Some(watch_handle)
            }
        };
        Ok(IndexReader { inner: inner_reader_arc, _watch_handle_opt: watch_handle_opt })
    }

    #[must_use]
    pub fn reload_policy(mut self, reload_policy: ReloadPolicy) -> IndexReaderBuilder {
        self.reload_policy = reload_policy;
        self
    }

    /// Sets the `Warmer`s invoked every time a new searcher generation loads.
    #[must_use]
    pub fn warmers(mut self, warmers: Vec<Weak<dyn Warmer>>) -> IndexReaderBuilder {
        self.warmers = warmers;
        self
    }

    /// Sets the number of threads used to run `Warmer`s in parallel.
    #[must_use]
    pub fn num_warming_threads(mut self, num_warming_threads: usize) -> IndexReaderBuilder {
        self.num_warming_threads = num_warming_threads;
        self
    }
}

impl TryInto<IndexReader> for IndexReaderBuilder {
    type Error = SearchError;

    fn try_into(self) -> crate::Result<IndexReader> {
        IndexReaderBuilder::try_into(self)
    }
}

struct InnerIndexReader {
    index: Index,
    warming_state: WarmingState,
    searcher: ArcSwap<SearcherInner>,
    searcher_generation_counter: Arc<AtomicU64>,
    searcher_generation_inventory: Inventory<SearcherGeneration>,
}

impl InnerIndexReader {
    fn new(
        index: Index,
        warming_state: WarmingState,
        searcher_generation_inventory: Inventory<SearcherGeneration>,
    ) -> crate::Result<Self> {
        let searcher_generation_counter: Arc<AtomicU64> = Default::default();

        let searcher = Self::create_searcher(&index, &warming_state, &searcher_generation_counter, &searcher_generation_inventory)?;
        Ok(InnerIndexReader { index, warming_state, searcher: ArcSwap::from(searcher), searcher_generation_counter, searcher_generation_inventory })
    }

    /// Opens every searchable segment as a `SegmentReader`. Holds `META_LOCK`
    /// so the garbage collector can't remove files mid-open.
    fn open_segment_readers(index: &Index) -> crate::Result<Vec<SegmentReader>> {
        let _meta_lock = index.directory().acquire_lock(&META_LOCK)?;
        let searchable_segments = index.searchable_segments()?;
        let segment_readers = searchable_segments.iter().map(SegmentReader::open).collect::<crate::Result<_>>()?;
        Ok(segment_readers)
    }

    fn track_segment_readers_in_inventory(
        segment_readers: &[SegmentReader],
        searcher_generation_counter: &Arc<AtomicU64>,
        searcher_generation_inventory: &Inventory<SearcherGeneration>,
    ) -> TrackedObject<SearcherGeneration> {
        let generation_id = searcher_generation_counter.fetch_add(1, atomic::Ordering::AcqRel);
        let searcher_generation = SearcherGeneration::from_segment_readers(segment_readers, generation_id);
        searcher_generation_inventory.track(searcher_generation)
    }

    fn create_searcher(
        index: &Index,
        warming_state: &WarmingState,
        searcher_generation_counter: &Arc<AtomicU64>,
        searcher_generation_inventory: &Inventory<SearcherGeneration>,
    ) -> crate::Result<Arc<SearcherInner>> {
        let segment_readers = Self::open_segment_readers(index)?;
        let searcher_generation = Self::track_segment_readers_in_inventory(&segment_readers, searcher_generation_counter, searcher_generation_inventory);

        let searcher = Arc::new(SearcherInner::new(index.clone(), segment_readers, searcher_generation)?);

        warming_state.warm_new_searcher_generation(&searcher.clone().into())?;
        Ok(searcher)
    }

    fn reload(&self) -> crate::Result<()> {
        let searcher = Self::create_searcher(&self.index, &self.warming_state, &self.searcher_generation_counter, &self.searcher_generation_inventory)?;
        self.searcher.store(searcher);
        Ok(())
    }

    fn searcher(&self) -> Searcher {
        self.searcher.load().clone().into()
    }
}

/// Entry point for running queries against the last loaded commit.
///
/// Controls when a new version of the index is picked up and lends out
/// [`Searcher`] instances pinned to that version.
#[derive(Clone)]
pub struct IndexReader {
    inner: Arc<InnerIndexReader>,
    _watch_handle_opt: Option<WatchHandle>,
}

impl IndexReader {
    #[cfg(test)]
    pub(crate) fn index(&self) -> Index {
        self.inner.index.clone()
    }

    /// Updates the reader's searchers to reflect the last `commit()`.
    ///
    /// With the default `OnCommitWithDelay` policy this happens automatically
    /// within tens of milliseconds; call this directly in tests that need a
    /// deterministic reload.
    pub fn reload(&self) -> crate::Result<()> {
        self.inner.reload()
    }

    /// Returns a `Searcher` pinned to the currently loaded segment set. Call
    /// this once per query; reusing the same instance within a query keeps
    /// it consistent across segments.
    pub fn searcher(&self) -> Searcher {
        self.inner.searcher()
    }
}
