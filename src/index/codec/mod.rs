//! The segment codec interface.
//!
//! Everything about how a segment's dictionary, postings, stored fields and
//! doc values are actually laid out on disk is deliberately opaque to the
//! rest of the crate: `SegmentWriter`, `IndexMerger` and `SegmentReader` all
//! go through this trait. `default_codec` provides the one concrete
//! implementation this crate ships and tests against.

mod default_codec;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use default_codec::DefaultCodec;

use crate::directory::Directory;
use crate::index::schema::FieldName;
use crate::index::SegmentId;
use crate::Result;

/// One posting: a local doc id plus per-field term frequency and the
/// term's positions within that field (for `PhraseSearcher`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingEntry {
    pub doc: u32,
    pub term_freq: u32,
    pub positions: Vec<u32>,
}

/// A term and every doc posting to it within one field, term-sorted within
/// the owning `FieldDictionary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermPostings {
    pub term: Vec<u8>,
    pub postings: Vec<PostingEntry>,
}

impl TermPostings {
    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }
}

/// The full dictionary (lexicographically sorted terms) plus postings for
/// one field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDictionary {
    pub terms: Vec<TermPostings>,
}

impl FieldDictionary {
    /// Binary searches the sorted term list.
    pub fn find(&self, term: &[u8]) -> Option<&TermPostings> {
        self.terms.binary_search_by(|t| t.term.as_slice().cmp(term)).ok().map(|i| &self.terms[i])
    }

    /// Every term whose bytes start with `prefix`, in sorted order.
    pub fn terms_with_prefix<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = &'a TermPostings> {
        let start = self.terms.partition_point(|t| t.term.as_slice() < prefix);
        self.terms[start..].iter().take_while(move |t| t.term.starts_with(prefix))
    }

    /// Every term whose bytes fall in `[lower, upper]` (inclusive), sorted.
    pub fn terms_in_range<'a>(
        &'a self,
        lower: Option<&'a [u8]>,
        upper: Option<&'a [u8]>,
    ) -> impl Iterator<Item = &'a TermPostings> {
        let start = match lower {
            Some(l) => self.terms.partition_point(|t| t.term.as_slice() < l),
            None => 0,
        };
        self.terms[start..].iter().take_while(move |t| match upper {
            Some(u) => t.term.as_slice() <= u,
            None => true,
        })
    }
}

/// The complete in-memory content of one segment: this is what
/// `SegmentWriter` builds up, what `IndexMerger` produces from N segments,
/// and what a codec implementation persists/loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentData {
    pub num_docs: u32,
    pub fields: HashMap<FieldName, FieldDictionary>,
    /// Stored field values, indexed by local doc id; `None` for deleted or
    /// never-stored docs.
    pub stored_fields: Vec<Option<crate::index::schema::Document>>,
    /// Per-field, per-doc doc-values column, for sorting/range queries.
    pub doc_values: HashMap<FieldName, Vec<Option<f64>>>,
    /// Per-field, per-doc quantized field norm, consumed by BM25.
    pub norms: HashMap<FieldName, Vec<u8>>,
}

impl SegmentData {
    pub fn size_in_bytes(&self) -> u64 {
        bincode::serialized_size(self).unwrap_or(0)
    }
}

/// Abstraction over how a segment's content is (de)serialized to a
/// `Directory`. Swappable independently of the rest of the crate.
pub trait Codec: Send + Sync + 'static {
    /// Writes every file making up `segment_id`, returning their paths
    /// (used by `SegmentUpdater` to register them with the
    /// `ManagedDirectory`).
    fn write_segment(
        &self,
        directory: &dyn Directory,
        segment_id: SegmentId,
        data: &SegmentData,
    ) -> Result<Vec<PathBuf>>;

    /// Loads back a previously written segment's content.
    fn read_segment(&self, directory: &dyn Directory, segment_id: SegmentId) -> Result<SegmentData>;

    /// The file names this codec would create for `segment_id`, without
    /// reading or writing anything. Used to compute a segment's on-disk
    /// size via file metadata alone.
    fn file_names(&self, segment_id: SegmentId) -> Vec<PathBuf>;
}
