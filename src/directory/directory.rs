use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::common::file_slice::FileSlice;
use crate::directory::error::{DeleteError, OpenReadError, OpenWriteError};
use crate::directory::{Lock, WatchCallback, WatchHandle, WritePtr};

/// Abstraction over the storage backend a segment's files live in.
///
/// Two implementations ship with this crate: [`MmapDirectory`]
/// (`crate::directory::mmap_directory`), backed by the filesystem, and
/// [`RamDirectory`] (`crate::directory::ram_directory`), fully in-memory.
/// Both give the identical bit-for-bit semantics minus fsync durability.
pub trait Directory: DirectoryClone + fmt::Debug + Send + Sync + 'static {
    /// Opens a file for reading, returning a lazily-readable `FileSlice`.
    fn open_read(&self, path: &Path) -> Result<FileSlice, OpenReadError>;

    /// Removes a file. Returns an error if the file does not exist.
    fn delete(&self, path: &Path) -> Result<(), DeleteError>;

    /// Returns whether the given path exists.
    fn exists(&self, path: &Path) -> Result<bool, OpenReadError>;

    /// Opens a file for writing, truncating any prior content.
    fn open_write(&self, path: &Path) -> Result<WritePtr, OpenWriteError>;

    /// Reads the entire content of a file into memory.
    fn atomic_read(&self, path: &Path) -> Result<Vec<u8>, OpenReadError>;

    /// Writes `data` to `path` atomically: either the whole file is visible
    /// to readers, or none of it is.
    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Ensures all writes are durable.
    fn sync_directory(&self) -> io::Result<()>;

    /// Acquires a lock, blocking or failing immediately per `lock.is_blocking`.
    fn acquire_lock(&self, lock: &Lock) -> Result<DirectoryLock, crate::common::errors::SearchError>;

    /// Registers `watch_callback` to be called whenever the meta file
    /// changes. Returns a handle that unregisters the callback on drop.
    fn watch(&self, watch_callback: WatchCallback) -> crate::Result<WatchHandle>;
}

/// RAII guard releasing a directory lock when dropped.
pub struct DirectoryLock(Box<dyn fmt::Debug + Send + Sync + 'static>);

impl DirectoryLock {
    pub fn from(boxed: Box<dyn fmt::Debug + Send + Sync + 'static>) -> DirectoryLock {
        DirectoryLock(boxed)
    }
}

impl fmt::Debug for DirectoryLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// `Directory` trait objects need to be clonable since `Index` clones its
/// directory handle freely; `Clone` itself isn't object safe so this
/// indirection provides it.
pub trait DirectoryClone {
    fn box_clone(&self) -> Box<dyn Directory>;
}

impl<T: Directory + Clone> DirectoryClone for T {
    fn box_clone(&self) -> Box<dyn Directory> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Directory> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Helper for implementations storing the live `Arc<dyn Directory>` that
/// `ManagedDirectory` wraps.
pub type DirectoryRc = Arc<dyn Directory>;
