use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::info;

use super::index_meta::{IndexMeta, SegmentMetaInventory};
use super::{IndexBuilder, IndexSettings, Segment, SegmentId, SegmentMeta};
use crate::common::errors::SearchError;
use crate::common::executor::Executor;
use crate::directory::error::OpenReadError;
use crate::directory::managed_directory::ManagedDirectory;
use crate::directory::mmap_directory::MmapDirectory;
use crate::directory::{Directory, INDEX_WRITER_LOCK};
use crate::indexer::index_writer::{MAX_NUM_THREAD, MEMORY_BUDGET_NUM_BYTES_MIN};
use crate::indexer::IndexWriter;
use crate::reader::{IndexReader, IndexReaderBuilder};
use crate::{Result, META_FILEPATH};

/// Reads `meta.json`, tracking every segment it mentions in `inventory`.
fn load_metas(directory: &dyn Directory, inventory: &SegmentMetaInventory) -> Result<IndexMeta> {
    let meta_data = directory.atomic_read(&META_FILEPATH)?;
    let meta_string = String::from_utf8(meta_data)
        .map_err(|_| SearchError::Corruption("meta.json is not valid utf8".to_string()))?;
    IndexMeta::deserialize(&meta_string, inventory)
        .map_err(|e| SearchError::Corruption(format!("meta.json cannot be deserialized: {e}")))
}

/// Entry point to an on-disk (or in-memory) index: schema, directory, and
/// the handle writers/readers are built from.
#[derive(Clone)]
pub struct Index {
    pub(super) directory: ManagedDirectory,
    pub(super) index_settings: IndexSettings,
    pub(super) executor: Arc<Executor>,
    pub(super) inventory: SegmentMetaInventory,
}

impl Index {
    pub fn search_executor(&self) -> &Executor {
        self.executor.as_ref()
    }

    pub fn set_multithread_executor(&mut self, num_threads: usize) -> Result<()> {
        self.executor = Arc::new(Executor::multi_thread(num_threads, "vellum-search-")?);
        Ok(())
    }

    pub fn set_shared_multithread_executor(&mut self, shared_thread_pool: Arc<Executor>) {
        self.executor = shared_thread_pool;
    }

    pub fn set_default_multithread_executor(&mut self) -> Result<()> {
        self.set_multithread_executor(num_cpus::get())
    }
}

impl Index {
    pub fn create<T: Into<Box<dyn Directory>>>(dir: T, settings: IndexSettings) -> Result<Index> {
        IndexBuilder::new().with_settings(settings).create(dir.into())
    }

    pub fn create_in_dir<P: AsRef<Path>>(directory_path: P, settings: IndexSettings) -> Result<Index> {
        IndexBuilder::new().with_settings(settings).create_in_dir(directory_path)
    }

    /// Creates a new `SegmentMeta`. As long as it is alive, its files are
    /// guaranteed not to be garbage collected, whether or not it is part of
    /// the committed snapshot yet.
    pub fn new_segment_meta(&self, segment_id: SegmentId, num_docs: u32) -> SegmentMeta {
        self.inventory.new_segment_meta(segment_id, num_docs)
    }

    /// Opens a new index writer, acquiring `INDEX_WRITER_LOCK`.
    pub fn writer_with_num_threads(
        &self,
        num_threads: usize,
        overall_memory_budget_in_bytes: usize,
    ) -> Result<IndexWriter> {
        let directory_lock = self.directory.acquire_lock(&INDEX_WRITER_LOCK)?;
        let memory_arena_in_bytes_per_thread = overall_memory_budget_in_bytes / num_threads;
        IndexWriter::new(self, num_threads, memory_arena_in_bytes_per_thread, directory_lock)
    }

    #[cfg(test)]
    pub fn writer_for_tests(&self) -> Result<IndexWriter> {
        self.writer_with_num_threads(1, MEMORY_BUDGET_NUM_BYTES_MIN)
    }

    /// Opens a multi-threaded writer, auto-sizing the thread count (capped
    /// at `MAX_NUM_THREAD`) from `memory_budget_in_bytes`.
    pub fn writer(&self, memory_budget_in_bytes: usize) -> Result<IndexWriter> {
        let mut num_threads = std::cmp::min(num_cpus::get(), MAX_NUM_THREAD);
        let memory_budget_num_bytes_per_thread = memory_budget_in_bytes / num_threads;
        if memory_budget_num_bytes_per_thread < MEMORY_BUDGET_NUM_BYTES_MIN {
            num_threads = (memory_budget_in_bytes / MEMORY_BUDGET_NUM_BYTES_MIN).max(1);
        }
        info!("creating index writer with {num_threads} threads");
        self.writer_with_num_threads(num_threads, memory_budget_in_bytes)
    }

    pub fn new_segment(&self) -> Segment {
        let segment_meta = self.inventory.new_segment_meta(SegmentId::generate_random(), 0);
        self.segment(segment_meta)
    }
}

impl Index {
    pub fn index_settings(&self) -> IndexSettings {
        self.index_settings.clone()
    }

    #[doc(hidden)]
    pub fn segment(&self, segment_meta: SegmentMeta) -> Segment {
        Segment::for_index(self.clone(), segment_meta)
    }

    pub fn searchable_segments(&self) -> Result<Vec<Segment>> {
        Ok(self.searchable_segment_metas()?.into_iter().map(|meta| self.segment(meta)).collect())
    }

    pub fn searchable_segment_metas(&self) -> Result<Vec<SegmentMeta>> {
        Ok(self.load_metas()?.segments)
    }

    pub fn searchable_segment_ids(&self) -> Result<Vec<SegmentId>> {
        Ok(self.searchable_segment_metas()?.iter().map(SegmentMeta::id).collect())
    }

    pub(crate) fn list_all_segment_metas(&self) -> Vec<SegmentMeta> {
        self.inventory.all()
    }

    pub fn directory(&self) -> &ManagedDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut ManagedDirectory {
        &mut self.directory
    }

    pub fn exists(dir: &dyn Directory) -> std::result::Result<bool, OpenReadError> {
        dir.exists(&META_FILEPATH)
    }
}

impl Index {
    pub fn open<T: Into<Box<dyn Directory>>>(directory: T) -> Result<Index> {
        let directory: Arc<dyn Directory> = Arc::from(directory.into());
        let directory = ManagedDirectory::wrap(directory)?;

        let inventory = SegmentMetaInventory::default();
        let _metas = load_metas(&directory, &inventory)?;

        let config_bytes = directory.atomic_read(&crate::INDEX_CONFIG_FILEPATH)?;
        let index_settings: IndexSettings = serde_json::from_slice(&config_bytes)
            .map_err(|e| SearchError::Corruption(format!("corrupt index_config.json: {e}")))?;

        Ok(Index { directory, index_settings, executor: Arc::new(Executor::single_thread()), inventory })
    }

    pub fn reader(&self) -> Result<IndexReader> {
        self.reader_builder().try_into()
    }

    pub fn load_metas(&self) -> Result<IndexMeta> {
        load_metas(self.directory(), &self.inventory)
    }

    pub fn reader_builder(&self) -> IndexReaderBuilder {
        IndexReaderBuilder::new(self.clone())
    }

    pub fn open_in_dir<P: AsRef<Path>>(directory_path: P) -> Result<Index> {
        let mmap_directory = MmapDirectory::open(directory_path).map_err(SearchError::Io)?;
        Index::open(Box::new(mmap_directory) as Box<dyn Directory>)
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({:?})", self.directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::schema::{analyze_default, Document, FieldType, FieldValue, Schema};
    use crate::indexer::LogMergePolicy;

    fn test_schema() -> Schema {
        Schema::builder()
            .add_field("title", FieldType::Text { indexed: true, stored: true, term_vectors: false })
            .add_field("body", FieldType::Text { indexed: true, stored: true, term_vectors: false })
            .build()
    }

    #[test]
    fn test_create_index_write_commit_search() {
        let settings = IndexSettings { schema: test_schema(), ..Default::default() };
        let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
        let mut writer = index.writer_for_tests().unwrap();
        writer.set_merge_policy(Box::new(LogMergePolicy::default()));

        for i in 0..20 {
            let mut doc = Document::new(format!("doc-{i}").into_bytes());
            doc.add_field("title", FieldValue::Text(format!("hello world {i}")));
            let analyzed = vec![analyze_default("title", &format!("hello world {i}"))];
            writer.add_document(doc, analyzed).unwrap();
        }
        writer.commit().unwrap();
        writer.wait_merging_threads().unwrap();

        let reader = index.reader().unwrap();
        let searcher = reader.searcher();
        assert_eq!(searcher.num_docs(), 20);
    }
}
