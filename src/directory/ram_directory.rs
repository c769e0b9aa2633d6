use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use ownedbytes::OwnedBytes;

use crate::common::errors::SearchError;
use crate::common::file_slice::{AntiCallToken, FileSlice, TerminatingWrite};
use crate::directory::directory::{Directory, DirectoryLock};
use crate::directory::error::{DeleteError, OpenReadError, OpenWriteError};
use crate::directory::watch_event_router::{WatchCallback, WatchCallbackList, WatchHandle};
use crate::directory::{Lock, WritePtr};

#[derive(Default, Clone)]
struct InnerDirectory {
    fs: HashMap<PathBuf, Arc<Vec<u8>>>,
}

/// A fully in-memory `Directory`, used for tests and short-lived indices.
/// Shares the exact same semantics as [`MmapDirectory`](super::mmap_directory::MmapDirectory)
/// except durability: `sync_directory` is a no-op.
#[derive(Clone, Default)]
pub struct RamDirectory {
    fs: Arc<RwLock<InnerDirectory>>,
    watch_router: Arc<WatchCallbackList>,
}

impl std::fmt::Debug for RamDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RamDirectory")
    }
}

struct VecWriter {
    path: PathBuf,
    data: Vec<u8>,
    shared_directory: RamDirectory,
    is_terminated: bool,
}

impl VecWriter {
    fn new(path_buf: PathBuf, shared_directory: RamDirectory) -> VecWriter {
        VecWriter { path: path_buf, data: Vec::new(), shared_directory, is_terminated: false }
    }
}

impl Drop for VecWriter {
    fn drop(&mut self) {
        if !self.is_terminated {
            let _ = self.flush();
        }
    }
}

impl Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.shared_directory.write(self.path.clone(), &self.data);
        Ok(())
    }
}

impl TerminatingWrite for VecWriter {
    fn terminate_ref(&mut self, _: AntiCallToken) -> io::Result<()> {
        self.is_terminated = true;
        self.flush()
    }
}

impl RamDirectory {
    pub fn create() -> RamDirectory {
        RamDirectory::default()
    }

    fn write(&self, path: PathBuf, data: &[u8]) {
        let mut fs = self.fs.write().unwrap();
        fs.fs.insert(path, Arc::new(data.to_vec()));
    }
}

impl Directory for RamDirectory {
    fn open_read(&self, path: &Path) -> Result<FileSlice, OpenReadError> {
        let fs = self.fs.read().unwrap();
        let data = fs
            .fs
            .get(path)
            .ok_or_else(|| OpenReadError::FileDoesNotExist(path.to_path_buf()))?
            .clone();
        Ok(FileSlice::new(Arc::new(OwnedBytes::new((*data).clone()))))
    }

    fn delete(&self, path: &Path) -> Result<(), DeleteError> {
        let mut fs = self.fs.write().unwrap();
        fs.fs.remove(path).ok_or_else(|| DeleteError::FileDoesNotExist(path.to_path_buf()))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> Result<bool, OpenReadError> {
        Ok(self.fs.read().unwrap().fs.contains_key(path))
    }

    fn open_write(&self, path: &Path) -> Result<WritePtr, OpenWriteError> {
        Ok(io::BufWriter::new(Box::new(VecWriter::new(path.to_path_buf(), self.clone()))))
    }

    fn atomic_read(&self, path: &Path) -> Result<Vec<u8>, OpenReadError> {
        let fs = self.fs.read().unwrap();
        fs.fs
            .get(path)
            .map(|data| data.as_ref().clone())
            .ok_or_else(|| OpenReadError::FileDoesNotExist(path.to_path_buf()))
    }

    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.write(path.to_path_buf(), data);
        self.watch_router.broadcast();
        Ok(())
    }

    fn sync_directory(&self) -> io::Result<()> {
        Ok(())
    }

    fn acquire_lock(&self, _lock: &Lock) -> Result<DirectoryLock, SearchError> {
        Ok(DirectoryLock::from(Box::new(())))
    }

    fn watch(&self, watch_callback: WatchCallback) -> crate::Result<WatchHandle> {
        Ok(self.watch_router.subscribe(watch_callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_directory_write_read() {
        let directory = RamDirectory::create();
        let mut writer = directory.open_write(Path::new("foo")).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.into_inner().unwrap().terminate().unwrap();
        let file = directory.open_read(Path::new("foo")).unwrap();
        assert_eq!(file.read_bytes().unwrap().as_slice(), b"hello");
    }

    #[test]
    fn test_ram_directory_delete_missing_errors() {
        let directory = RamDirectory::create();
        assert!(directory.delete(Path::new("nope")).is_err());
    }

    #[test]
    fn test_ram_directory_atomic_write_read() {
        let directory = RamDirectory::create();
        directory.atomic_write(Path::new("meta.json"), b"{}").unwrap();
        assert_eq!(directory.atomic_read(Path::new("meta.json")).unwrap(), b"{}");
    }
}
