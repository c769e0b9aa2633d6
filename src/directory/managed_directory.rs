use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::common::errors::SearchError;
use crate::directory::directory::{Directory, DirectoryLock};
use crate::directory::error::{DeleteError, OpenReadError, OpenWriteError};
use crate::directory::watch_event_router::{WatchCallback, WatchHandle};
use crate::directory::{FileSlice, GarbageCollectionResult, Lock, WritePtr};

const MANAGED_FILEPATH: &str = ".managed.json";

/// Wraps any `Directory`, tracking every file this crate itself created so
/// garbage collection never deletes a file it doesn't recognize (e.g. a
/// `.gitkeep` an embedder placed in the same directory).
#[derive(Clone)]
pub struct ManagedDirectory {
    directory: Arc<dyn Directory>,
    managed_paths: Arc<RwLock<HashSet<PathBuf>>>,
}

impl std::fmt::Debug for ManagedDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ManagedDirectory({:?})", self.directory)
    }
}

impl ManagedDirectory {
    /// Wraps `directory`, loading the existing `.managed.json` manifest if
    /// one is present.
    pub fn wrap(directory: Arc<dyn Directory>) -> crate::Result<ManagedDirectory> {
        let managed_paths = match directory.atomic_read(Path::new(MANAGED_FILEPATH)) {
            Ok(data) => {
                let paths: Vec<PathBuf> = serde_json::from_slice(&data)
                    .map_err(|e| SearchError::Corruption(format!("corrupt managed.json: {e}")))?;
                paths.into_iter().collect()
            }
            Err(OpenReadError::FileDoesNotExist(_)) => HashSet::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(ManagedDirectory {
            directory,
            managed_paths: Arc::new(RwLock::new(managed_paths)),
        })
    }

    /// Records `path` as created by this crate, so future GC passes may
    /// reclaim it once it is no longer referenced by any kept snapshot.
    pub fn register_file_as_managed(&self, path: &Path) -> io::Result<()> {
        let mut managed_paths = self.managed_paths.write().unwrap();
        if managed_paths.insert(path.to_path_buf()) {
            self.save_managed_paths(&managed_paths)?;
        }
        Ok(())
    }

    fn save_managed_paths(&self, managed_paths: &HashSet<PathBuf>) -> io::Result<()> {
        let paths: Vec<&PathBuf> = managed_paths.iter().collect();
        let json = serde_json::to_vec(&paths)?;
        self.directory.atomic_write(Path::new(MANAGED_FILEPATH), &json)
    }

    /// Deletes every managed file not present in `live_files`.
    ///
    /// Files still mmap'd by an open `IndexReader` may fail to delete on
    /// some platforms; those are reported in
    /// `GarbageCollectionResult::failed_to_delete_files` and retried on the
    /// next GC pass rather than treated as an error.
    pub fn garbage_collect(&self, live_files: impl Fn() -> HashSet<PathBuf>) -> GarbageCollectionResult {
        let mut managed_paths = self.managed_paths.write().unwrap();
        let live = live_files();
        let mut deleted_files = Vec::new();
        let mut failed_to_delete_files = Vec::new();
        let doomed: Vec<PathBuf> =
            managed_paths.iter().filter(|p| !live.contains(*p)).cloned().collect();
        for path in doomed {
            match self.directory.delete(&path) {
                Ok(()) | Err(DeleteError::FileDoesNotExist(_)) => {
                    managed_paths.remove(&path);
                    deleted_files.push(path);
                }
                Err(_) => failed_to_delete_files.push(path),
            }
        }
        let _ = self.save_managed_paths(&managed_paths);
        GarbageCollectionResult { deleted_files, failed_to_delete_files }
    }

    pub fn list_managed_files(&self) -> HashSet<PathBuf> {
        self.managed_paths.read().unwrap().clone()
    }
}

impl Directory for ManagedDirectory {
    fn open_read(&self, path: &Path) -> Result<FileSlice, OpenReadError> {
        self.directory.open_read(path)
    }

    fn delete(&self, path: &Path) -> Result<(), DeleteError> {
        self.directory.delete(path)
    }

    fn exists(&self, path: &Path) -> Result<bool, OpenReadError> {
        self.directory.exists(path)
    }

    fn open_write(&self, path: &Path) -> Result<WritePtr, OpenWriteError> {
        self.register_file_as_managed(path).map_err(|e| OpenWriteError::wrap_io_error(e, path.to_path_buf()))?;
        self.directory.open_write(path)
    }

    fn atomic_read(&self, path: &Path) -> Result<Vec<u8>, OpenReadError> {
        self.directory.atomic_read(path)
    }

    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.register_file_as_managed(path)?;
        self.directory.atomic_write(path, data)
    }

    fn sync_directory(&self) -> io::Result<()> {
        self.directory.sync_directory()
    }

    fn acquire_lock(&self, lock: &Lock) -> Result<DirectoryLock, SearchError> {
        self.directory.acquire_lock(lock)
    }

    fn watch(&self, watch_callback: WatchCallback) -> crate::Result<WatchHandle> {
        self.directory.watch(watch_callback)
    }
}

#[derive(Serialize, Deserialize)]
struct ManagedPaths(Vec<PathBuf>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::ram_directory::RamDirectory;

    #[test]
    fn test_managed_directory_tracks_writes() {
        let ram = Arc::new(RamDirectory::create());
        let managed = ManagedDirectory::wrap(ram).unwrap();
        managed.atomic_write(Path::new("seg1.store"), b"data").unwrap();
        assert!(managed.list_managed_files().contains(&PathBuf::from("seg1.store")));
    }

    #[test]
    fn test_managed_directory_gc_removes_dead_files() {
        let ram = Arc::new(RamDirectory::create());
        let managed = ManagedDirectory::wrap(ram).unwrap();
        managed.atomic_write(Path::new("dead.store"), b"data").unwrap();
        managed.atomic_write(Path::new("live.store"), b"data").unwrap();
        let result = managed.garbage_collect(|| {
            let mut live = HashSet::new();
            live.insert(PathBuf::from("live.store"));
            live
        });
        assert_eq!(result.deleted_files, vec![PathBuf::from("dead.store")]);
        assert!(managed.list_managed_files().contains(&PathBuf::from("live.store")));
    }
}
