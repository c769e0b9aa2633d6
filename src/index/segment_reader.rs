use std::fmt;
use std::sync::Arc;

use super::codec::{Codec, DefaultCodec, FieldDictionary, SegmentData, TermPostings};
use super::schema::{Document, FieldName};
use super::{Segment, SegmentId};
use crate::common::alive_bitset::AliveBitSet;
use crate::Result;

/// A segment opened for reading: its whole `SegmentData` loaded into memory
/// plus the `AliveBitSet` reflecting deletions applied since it was built.
#[derive(Clone)]
pub struct SegmentReader {
    segment_id: SegmentId,
    data: Arc<SegmentData>,
    alive_bitset: Option<AliveBitSet>,
}

impl SegmentReader {
    /// Loads a segment's postings, stored fields, doc values and norms from
    /// its codec files. `alive_bitset` is `None` when the segment has no
    /// deletions at all.
    pub fn open(segment: &Segment) -> Result<SegmentReader> {
        Self::open_with_codec(segment, &DefaultCodec)
    }

    pub fn open_with_codec(segment: &Segment, codec: &dyn Codec) -> Result<SegmentReader> {
        let data = codec.read_segment(segment.index().directory(), segment.id())?;
        Ok(SegmentReader { segment_id: segment.id(), data: Arc::new(data), alive_bitset: None })
    }

    pub(crate) fn with_alive_bitset(mut self, alive_bitset: Option<AliveBitSet>) -> SegmentReader {
        self.alive_bitset = alive_bitset;
        self
    }

    pub fn segment_id(&self) -> SegmentId {
        self.segment_id
    }

    pub fn num_docs(&self) -> u32 {
        self.data.num_docs
    }

    /// Number of docs still alive, accounting for deletions.
    pub fn num_alive_docs(&self) -> u32 {
        match &self.alive_bitset {
            Some(bitset) => bitset.num_alive(),
            None => self.data.num_docs,
        }
    }

    pub fn is_deleted(&self, doc: u32) -> bool {
        self.alive_bitset.as_ref().map(|b| b.is_deleted(doc)).unwrap_or(false)
    }

    pub fn alive_bitset(&self) -> Option<&AliveBitSet> {
        self.alive_bitset.as_ref()
    }

    pub fn has_deletes(&self) -> bool {
        self.alive_bitset.as_ref().map(|b| b.num_alive() < b.num_docs()).unwrap_or(false)
    }

    pub fn field_dictionary(&self, field: &str) -> Option<&FieldDictionary> {
        self.data.fields.get(field)
    }

    /// Postings for `term` in `field`, or `None` if the term is absent.
    pub fn term_postings(&self, field: &str, term: &[u8]) -> Option<&TermPostings> {
        self.field_dictionary(field)?.find(term)
    }

    /// Number of docs (pre-deletion) containing `term` in `field`.
    pub fn doc_freq(&self, field: &str, term: &[u8]) -> u32 {
        self.term_postings(field, term).map(TermPostings::doc_freq).unwrap_or(0)
    }

    pub fn stored_fields(&self, doc: u32) -> Option<&Document> {
        self.data.stored_fields.get(doc as usize).and_then(|d| d.as_ref())
    }

    pub fn doc_value(&self, field: &str, doc: u32) -> Option<f64> {
        self.data.doc_values.get(field)?.get(doc as usize).copied().flatten()
    }

    pub fn norm(&self, field: &str, doc: u32) -> u8 {
        self.data.norms.get(field).and_then(|n| n.get(doc as usize)).copied().unwrap_or(0)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldName> {
        self.data.fields.keys()
    }
}

impl fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentReader({}, num_docs={})", self.segment_id, self.data.num_docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::codec::PostingEntry;
    use crate::index::{Index, IndexBuilder, IndexSettings};
    use std::collections::HashMap;

    #[test]
    fn test_open_segment_reader_roundtrip() {
        let index: Index = IndexBuilder::new().with_settings(IndexSettings::default()).create_in_ram().unwrap();
        let segment = index.new_segment();

        let mut fields = HashMap::new();
        fields.insert(
            "title".to_string(),
            FieldDictionary {
                terms: vec![TermPostings {
                    term: b"hello".to_vec(),
                    postings: vec![PostingEntry { doc: 0, term_freq: 1, positions: vec![0] }],
                }],
            },
        );
        let data = SegmentData {
            num_docs: 1,
            fields,
            stored_fields: vec![None],
            doc_values: HashMap::new(),
            norms: HashMap::new(),
        };
        DefaultCodec.write_segment(segment.index().directory(), segment.id(), &data).unwrap();

        let reader = SegmentReader::open(&segment).unwrap();
        assert_eq!(reader.num_docs(), 1);
        assert_eq!(reader.doc_freq("title", b"hello"), 1);
        assert!(reader.term_postings("title", b"missing").is_none());
    }
}
