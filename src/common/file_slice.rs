//! Lazy, shareable byte ranges backed by a `Directory`-owned file.
//!
//! A `FileSlice` is how segment readers hand out zero-copy views into a
//! memory-mapped (or RAM-backed) file without needing to read the whole
//! file eagerly.

use std::fmt;
use std::io;
use std::ops::Range;
use std::sync::Arc;

use ownedbytes::OwnedBytes;

/// Abstraction over "a readable range of a file", implemented once per
/// `Directory` backend (`mmap`, RAM).
pub trait FileHandle: 'static + Send + Sync + fmt::Debug {
    /// Reads the given byte range eagerly into an owned buffer.
    fn read_bytes(&self, range: Range<usize>) -> io::Result<OwnedBytes>;

    /// Total length of the underlying file.
    fn len(&self) -> usize;
}

impl FileHandle for OwnedBytes {
    fn read_bytes(&self, range: Range<usize>) -> io::Result<OwnedBytes> {
        Ok(self.slice(range))
    }

    fn len(&self) -> usize {
        OwnedBytes::len(self)
    }
}

/// A lazily-readable, cheaply cloneable window into a file.
#[derive(Clone)]
pub struct FileSlice {
    data: Arc<dyn FileHandle>,
    range: Range<usize>,
}

impl fmt::Debug for FileSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSlice({:?})", self.range)
    }
}

impl FileSlice {
    /// Wraps an entire file handle as a slice.
    pub fn new(file_handle: Arc<dyn FileHandle>) -> Self {
        let len = file_handle.len();
        FileSlice { data: file_handle, range: 0..len }
    }

    /// Builds a `FileSlice` restricted to `range` of `file_handle`.
    pub fn new_with_num_bytes(file_handle: Arc<dyn FileHandle>, num_bytes: usize) -> Self {
        FileSlice { data: file_handle, range: 0..num_bytes }
    }

    /// Number of bytes covered by this slice.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Returns a sub-slice, `range` being relative to this slice's start.
    pub fn slice(&self, range: Range<usize>) -> FileSlice {
        assert!(range.end <= self.len(), "slice out of bounds");
        FileSlice {
            data: self.data.clone(),
            range: (self.range.start + range.start)..(self.range.start + range.end),
        }
    }

    /// Eagerly reads the full slice into memory.
    pub fn read_bytes(&self) -> io::Result<OwnedBytes> {
        self.data.read_bytes(self.range.clone())
    }

    /// Eagerly reads a sub-range, relative to this slice's start.
    pub fn read_bytes_slice(&self, range: Range<usize>) -> io::Result<OwnedBytes> {
        assert!(range.end <= self.len(), "range out of bounds");
        self.data.read_bytes((self.range.start + range.start)..(self.range.start + range.end))
    }

    /// Splits this slice at `split_point`, relative to its own start.
    pub fn split(self, split_point: usize) -> (FileSlice, FileSlice) {
        (self.slice(0..split_point), self.slice(split_point..self.len()))
    }
}

/// A token only `Directory` implementations can construct, required by
/// [`TerminatingWrite::terminate_ref`]. This prevents callers from mistakenly
/// calling `terminate_ref` directly instead of going through `terminate`,
/// which ensures the underlying file is properly flushed and closed exactly
/// once.
pub struct AntiCallToken(());

impl AntiCallToken {
    pub(crate) fn new() -> AntiCallToken {
        AntiCallToken(())
    }
}

/// A `Write` that needs an explicit, fallible finalization step (flush +
/// fsync + close) before the bytes written are durable.
pub trait TerminatingWrite: io::Write + Send + Sync {
    /// Called once all the bytes have been written. Implementations must
    /// flush and, where applicable, fsync the underlying file.
    fn terminate_ref(&mut self, token: AntiCallToken) -> io::Result<()>;

    /// Indicates that the data has been written and should be persisted.
    fn terminate(mut self) -> io::Result<()>
    where
        Self: Sized,
    {
        self.terminate_ref(AntiCallToken::new())
    }
}

impl TerminatingWrite for Vec<u8> {
    fn terminate_ref(&mut self, _: AntiCallToken) -> io::Result<()> {
        io::Write::flush(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_slice_read_and_split() {
        let handle: Arc<dyn FileHandle> = Arc::new(OwnedBytes::new(vec![1u8, 2, 3, 4, 5]));
        let slice = FileSlice::new(handle);
        assert_eq!(slice.len(), 5);
        let (left, right) = slice.split(2);
        assert_eq!(left.read_bytes().unwrap().as_slice(), &[1, 2]);
        assert_eq!(right.read_bytes().unwrap().as_slice(), &[3, 4, 5]);
    }

    #[test]
    fn test_file_slice_sub_slice() {
        let handle: Arc<dyn FileHandle> = Arc::new(OwnedBytes::new(vec![10u8, 20, 30, 40]));
        let slice = FileSlice::new(handle);
        let sub = slice.slice(1..3);
        assert_eq!(sub.read_bytes().unwrap().as_slice(), &[20, 30]);
    }
}
