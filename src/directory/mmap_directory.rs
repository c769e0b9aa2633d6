use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use fs4::FileExt;
use memmap2::Mmap;
use ownedbytes::OwnedBytes;

use crate::common::errors::SearchError;
use crate::common::file_slice::{AntiCallToken, FileSlice, TerminatingWrite};
use crate::directory::directory::{Directory, DirectoryLock};
use crate::directory::error::{DeleteError, OpenReadError, OpenWriteError};
use crate::directory::watch_event_router::{WatchCallback, WatchCallbackList, WatchHandle};
use crate::directory::{Lock, WritePtr};

/// A `Directory` backed by the filesystem, memory-mapping files for reads.
#[derive(Clone)]
pub struct MmapDirectory {
    root_path: PathBuf,
    mmap_cache: Arc<Mutex<HashMap<PathBuf, Weak<Mmap>>>>,
    watch_router: Arc<WatchCallbackList>,
}

impl std::fmt::Debug for MmapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MmapDirectory({:?})", self.root_path)
    }
}

struct MmapFileHandle {
    mmap: Arc<Mmap>,
}

impl std::fmt::Debug for MmapFileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MmapFileHandle(len={})", self.mmap.len())
    }
}

impl crate::common::file_slice::FileHandle for MmapFileHandle {
    fn read_bytes(&self, range: std::ops::Range<usize>) -> io::Result<OwnedBytes> {
        Ok(OwnedBytes::new(self.mmap[range].to_vec()))
    }

    fn len(&self) -> usize {
        self.mmap.len()
    }
}

struct SafeFileWriter {
    file: File,
    is_terminated: bool,
}

impl SafeFileWriter {
    fn new(file: File) -> SafeFileWriter {
        SafeFileWriter { file, is_terminated: false }
    }
}

impl Drop for SafeFileWriter {
    fn drop(&mut self) {
        if !self.is_terminated {
            let _ = self.file.flush();
        }
    }
}

impl Write for SafeFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl TerminatingWrite for SafeFileWriter {
    fn terminate_ref(&mut self, _: AntiCallToken) -> io::Result<()> {
        self.is_terminated = true;
        self.file.flush()?;
        self.file.sync_all()
    }
}

impl MmapDirectory {
    /// Opens or creates a directory at `root_path`. `root_path` must already
    /// exist; this crate never creates the root directory itself.
    pub fn open<P: AsRef<Path>>(root_path: P) -> io::Result<MmapDirectory> {
        let root_path = root_path.as_ref().to_path_buf();
        if !root_path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{root_path:?} does not exist or is not a directory"),
            ));
        }
        Ok(MmapDirectory {
            root_path,
            mmap_cache: Arc::new(Mutex::new(HashMap::new())),
            watch_router: Arc::new(WatchCallbackList::default()),
        })
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        self.root_path.join(path)
    }

    fn open_mmap(&self, full_path: &Path) -> io::Result<Arc<Mmap>> {
        let mut cache = self.mmap_cache.lock().unwrap();
        if let Some(mmap) = cache.get(full_path).and_then(Weak::upgrade) {
            return Ok(mmap);
        }
        let file = File::open(full_path)?;
        let mmap = if file.metadata()?.len() == 0 {
            // `memmap2` refuses to map empty files.
            Arc::new(unsafe { Mmap::map(&tempfile::tempfile()?)? })
        } else {
            Arc::new(unsafe { Mmap::map(&file)? })
        };
        cache.insert(full_path.to_path_buf(), Arc::downgrade(&mmap));
        Ok(mmap)
    }
}

impl Directory for MmapDirectory {
    fn open_read(&self, path: &Path) -> Result<FileSlice, OpenReadError> {
        let full_path = self.resolve_path(path);
        if !full_path.exists() {
            return Err(OpenReadError::FileDoesNotExist(path.to_path_buf()));
        }
        let mmap = self
            .open_mmap(&full_path)
            .map_err(|e| OpenReadError::wrap_io_error(e, path.to_path_buf()))?;
        Ok(FileSlice::new(Arc::new(MmapFileHandle { mmap })))
    }

    fn delete(&self, path: &Path) -> Result<(), DeleteError> {
        let full_path = self.resolve_path(path);
        self.mmap_cache.lock().unwrap().remove(&full_path);
        fs::remove_file(&full_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                DeleteError::FileDoesNotExist(path.to_path_buf())
            } else {
                DeleteError::wrap_io_error(e, path.to_path_buf())
            }
        })
    }

    fn exists(&self, path: &Path) -> Result<bool, OpenReadError> {
        Ok(self.resolve_path(path).exists())
    }

    fn open_write(&self, path: &Path) -> Result<WritePtr, OpenWriteError> {
        let full_path = self.resolve_path(path);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full_path)
            .map_err(|e| OpenWriteError::wrap_io_error(e, path.to_path_buf()))?;
        Ok(io::BufWriter::new(Box::new(SafeFileWriter::new(file))))
    }

    fn atomic_read(&self, path: &Path) -> Result<Vec<u8>, OpenReadError> {
        let full_path = self.resolve_path(path);
        fs::read(&full_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                OpenReadError::FileDoesNotExist(path.to_path_buf())
            } else {
                OpenReadError::wrap_io_error(e, path.to_path_buf())
            }
        })
    }

    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        use atomicwrites::{AtomicFile, OverwriteBehavior};
        let full_path = self.resolve_path(path);
        let af = AtomicFile::new(&full_path, OverwriteBehavior::AllowOverwrite);
        af.write(|f| f.write_all(data))
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        self.mmap_cache.lock().unwrap().remove(&full_path);
        self.watch_router.broadcast();
        Ok(())
    }

    fn sync_directory(&self) -> io::Result<()> {
        let file = File::open(&self.root_path)?;
        file.sync_all()
    }

    fn acquire_lock(&self, lock: &Lock) -> Result<DirectoryLock, SearchError> {
        let full_path = self.resolve_path(&lock.filepath);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&full_path)
            .map_err(SearchError::Io)?;
        if lock.is_blocking {
            file.lock_exclusive().map_err(SearchError::Io)?;
        } else {
            file.try_lock_exclusive().map_err(|_| SearchError::IndexLocked)?;
        }
        struct LockGuard {
            file: File,
            path: PathBuf,
        }
        impl std::fmt::Debug for LockGuard {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "Lock({:?})", self.path)
            }
        }
        impl Drop for LockGuard {
            fn drop(&mut self) {
                let _ = FileExt::unlock(&self.file);
            }
        }
        Ok(DirectoryLock::from(Box::new(LockGuard { file, path: full_path })))
    }

    fn watch(&self, watch_callback: WatchCallback) -> crate::Result<WatchHandle> {
        Ok(self.watch_router.subscribe(watch_callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mmap_directory_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let directory = MmapDirectory::open(tmp.path()).unwrap();
        let mut writer = directory.open_write(Path::new("data.bin")).unwrap();
        writer.write_all(b"hello world").unwrap();
        writer.into_inner().unwrap().terminate().unwrap();

        let slice = directory.open_read(Path::new("data.bin")).unwrap();
        assert_eq!(slice.read_bytes().unwrap().as_slice(), b"hello world");
    }

    #[test]
    fn test_mmap_directory_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let directory = MmapDirectory::open(tmp.path()).unwrap();
        directory.atomic_write(Path::new("meta.json"), b"{}").unwrap();
        assert!(directory.exists(Path::new("meta.json")).unwrap());
        directory.delete(Path::new("meta.json")).unwrap();
        assert!(!directory.exists(Path::new("meta.json")).unwrap());
    }

    #[test]
    fn test_mmap_directory_lock_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let directory = MmapDirectory::open(tmp.path()).unwrap();
        let lock = Lock { filepath: PathBuf::from(".writer.lock"), is_blocking: false };
        let _guard = directory.acquire_lock(&lock).unwrap();
        assert!(directory.acquire_lock(&lock).is_err());
    }
}
