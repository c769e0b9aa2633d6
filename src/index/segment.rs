use std::fmt;
use std::path::PathBuf;

use super::SegmentComponent;
use crate::directory::error::{OpenReadError, OpenWriteError};
use crate::directory::{Directory, FileSlice, WritePtr};
use crate::index::{Index, SegmentId, SegmentMeta};

/// A segment is a single immutable piece of the index: a contiguous range
/// of local doc ids plus the postings, stored fields, doc values and norms
/// for them.
#[derive(Clone)]
pub struct Segment {
    index: Index,
    meta: SegmentMeta,
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Segment({})", self.id())
    }
}

impl Segment {
    pub(crate) fn for_index(index: Index, meta: SegmentMeta) -> Segment {
        Segment { index, meta }
    }

    pub fn id(&self) -> SegmentId {
        self.meta.id()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn meta(&self) -> &SegmentMeta {
        &self.meta
    }

    /// Called once, right before persisting a freshly-built in-memory
    /// segment, to stamp its final doc count.
    pub(crate) fn with_num_docs(self, num_docs: u32) -> Segment {
        Segment { index: self.index, meta: self.meta.with_num_docs(num_docs) }
    }

    pub fn relative_path(&self, component: SegmentComponent) -> PathBuf {
        self.meta.relative_path(component)
    }

    pub fn open_read(&self, component: SegmentComponent) -> Result<FileSlice, OpenReadError> {
        let path = self.relative_path(component);
        self.index.directory().open_read(&path)
    }

    pub fn open_write(&mut self, component: SegmentComponent) -> Result<WritePtr, OpenWriteError> {
        let path = self.relative_path(component);
        self.index.directory_mut().open_write(&path)
    }
}
