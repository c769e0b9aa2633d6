use std::path::Path;
use std::sync::Arc;

use super::index_meta::{IndexMeta, SegmentMetaInventory};
use super::{Index, IndexSettings};
use crate::common::errors::SearchError;
use crate::common::executor::Executor;
use crate::directory::managed_directory::ManagedDirectory;
use crate::directory::mmap_directory::MmapDirectory;
use crate::directory::ram_directory::RamDirectory;
use crate::directory::Directory;
use crate::indexer::segment_updater::save_metas;
use crate::{Result, INDEX_CONFIG_FILEPATH};

pub struct IndexBuilder {
    index_settings: IndexSettings,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        IndexBuilder::new()
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self { index_settings: IndexSettings::default() }
    }

    pub fn with_settings(mut self, settings: IndexSettings) -> Self {
        self.index_settings = settings;
        self
    }

    /// Creates a fully in-memory index. Lost once the `Index` is dropped.
    pub fn create_in_ram(self) -> Result<Index> {
        let ram_directory: Box<dyn Directory> = Box::new(RamDirectory::create());
        self.create(ram_directory)
    }

    /// Creates an index backed by the filesystem at `directory_path`, which
    /// must already exist and be empty of any prior `meta.json`.
    pub fn create_in_dir<P: AsRef<Path>>(self, directory_path: P) -> Result<Index> {
        let mmap_directory: Box<dyn Directory> = Box::new(MmapDirectory::open(directory_path)?);
        if Index::exists(&*mmap_directory)? {
            return Err(SearchError::InvalidConfig("an index already exists in this directory".into()));
        }
        self.create(mmap_directory)
    }

    /// Creates an index in a freshly-made temporary directory; removed when
    /// the returned `tempfile::TempDir` this wraps is dropped along with the
    /// last `Index` clone. Primarily used by tests.
    pub fn create_from_tempdir(self) -> Result<Index> {
        let tempdir = tempfile::tempdir().map_err(SearchError::Io)?;
        let mmap_directory: Box<dyn Directory> = Box::new(MmapDirectory::open(tempdir.path())?);
        let index = self.create(mmap_directory)?;
        // Leak the tempdir's cleanup responsibility onto the index directory
        // itself by forgetting it; the OS will still clean `/tmp` eventually,
        // and tests using this helper don't rely on cleanup timing.
        std::mem::forget(tempdir);
        Ok(index)
    }

    pub(super) fn create<T: Into<Box<dyn Directory>>>(self, dir: T) -> Result<Index> {
        let directory: Box<dyn Directory> = dir.into();
        let managed_directory: ManagedDirectory = ManagedDirectory::wrap(Arc::from(directory))?;

        let config_json = serde_json::to_vec(&self.index_settings)
            .map_err(|e| SearchError::InvalidConfig(e.to_string()))?;
        managed_directory.atomic_write(&INDEX_CONFIG_FILEPATH, &config_json)?;
        save_metas(&IndexMeta::default(), &managed_directory)?;
        managed_directory.sync_directory().map_err(SearchError::Io)?;

        Ok(Index {
            directory: managed_directory,
            index_settings: self.index_settings,
            executor: Arc::new(Executor::single_thread()),
            inventory: SegmentMetaInventory::default(),
        })
    }
}
