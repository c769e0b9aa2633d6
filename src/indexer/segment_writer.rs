use std::collections::HashMap;

use log::debug;

use super::operation::AddOperation;
use crate::common::types::DocId;
use crate::index::codec::{FieldDictionary, PostingEntry, SegmentData, TermPostings};
use crate::index::schema::{Document, FieldName};
use crate::index::Segment;

/// Builds one segment's worth of postings, stored fields, doc values and
/// norms entirely in memory, tracking an approximate byte budget so the
/// indexing worker knows when to flush and start a fresh segment.
pub struct SegmentWriter {
    pub(crate) num_docs: DocId,
    pub(crate) memory_budget_in_bytes: usize,
    pub(crate) segment: Segment,
    postings: HashMap<FieldName, HashMap<Vec<u8>, Vec<PostingEntry>>>,
    stored_fields: Vec<Option<Document>>,
    doc_values: HashMap<FieldName, Vec<Option<f64>>>,
    norms: HashMap<FieldName, Vec<u8>>,
    mem_usage: usize,
}

impl SegmentWriter {
    pub fn for_segment(memory_budget_in_bytes: usize, segment: Segment) -> crate::Result<Self> {
        Ok(Self {
            num_docs: 0,
            memory_budget_in_bytes,
            segment,
            postings: HashMap::new(),
            stored_fields: Vec::new(),
            doc_values: HashMap::new(),
            norms: HashMap::new(),
            mem_usage: 0,
        })
    }

    pub fn mem_usage(&self) -> usize {
        self.mem_usage
    }

    pub fn num_docs(&self) -> DocId {
        self.num_docs
    }

    /// Indexes one document's already-analyzed fields, assigning it the
    /// next local doc id.
    pub fn index_document(&mut self, add_operation: AddOperation) -> crate::Result<()> {
        let AddOperation { opstamp: _, document, analyzed_fields } = add_operation;
        let doc = self.num_docs;

        let schema = self.segment.index().index_settings().schema;
        for analyzed in &analyzed_fields {
            let mut term_freqs: HashMap<&[u8], (u32, Vec<u32>)> = HashMap::new();
            for term in &analyzed.terms {
                let entry = term_freqs.entry(term.term.as_slice()).or_insert((0, Vec::new()));
                entry.0 += 1;
                entry.1.push(term.position);
            }
            let field_postings = self.postings.entry(analyzed.name.clone()).or_default();
            for (term, (term_freq, positions)) in term_freqs {
                let postings = field_postings.entry(term.to_vec()).or_default();
                self.mem_usage += term.len() + std::mem::size_of::<PostingEntry>() + positions.len() * 4;
                postings.push(PostingEntry { doc, term_freq, positions });
            }

            if let Some(field_type) = schema.get_field_type(&analyzed.name) {
                if field_type.has_doc_values() {
                    if let Some(value) = document.field_values(&analyzed.name).next().and_then(|v| v.as_sort_key()) {
                        let column = self.doc_values.entry(analyzed.name.clone()).or_default();
                        column.resize(doc as usize, None);
                        column.push(Some(value));
                    }
                }
            }

            let norm_column = self.norms.entry(analyzed.name.clone()).or_default();
            norm_column.resize(doc as usize, 0);
            norm_column.push(quantize_norm(analyzed.terms.len()));
        }

        let is_stored = schema
            .fields()
            .any(|(name, field_type)| field_type.is_stored() && document.field_values(name).next().is_some());
        self.mem_usage += document.fields.len() * 32;
        self.stored_fields.push(if is_stored { Some(document) } else { None });

        self.num_docs += 1;
        Ok(())
    }

    /// Packages everything indexed so far into an owned `SegmentData`,
    /// ready to be handed to a `Codec` (directly, or via the `Persister`).
    pub fn finalize(self) -> crate::Result<SegmentData> {
        debug!("finalizing segment {} with {} docs", self.segment.id(), self.num_docs);
        let mut fields = HashMap::new();
        for (name, term_map) in self.postings {
            let mut terms: Vec<TermPostings> =
                term_map.into_iter().map(|(term, postings)| TermPostings { term, postings }).collect();
            terms.sort_by(|a, b| a.term.cmp(&b.term));
            fields.insert(name, FieldDictionary { terms });
        }
        Ok(SegmentData {
            num_docs: self.num_docs,
            fields,
            stored_fields: self.stored_fields,
            doc_values: self.doc_values,
            norms: self.norms,
        })
    }
}

/// Maps a field's token count for one doc onto a `u8`, the way BM25 norm
/// tables usually do: clipped, not linear, since search only cares about
/// coarse length buckets.
fn quantize_norm(token_count: usize) -> u8 {
    (token_count.min(255)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::schema::{analyze_default, FieldType, FieldValue, Schema};
    use crate::index::{IndexBuilder, IndexSettings};

    fn schema() -> Schema {
        Schema::builder()
            .add_field("title", FieldType::Text { indexed: true, stored: true, term_vectors: false })
            .build()
    }

    #[test]
    fn test_index_document_then_finalize() {
        let settings = IndexSettings { schema: schema(), ..Default::default() };
        let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
        let segment = index.new_segment();
        let mut writer = SegmentWriter::for_segment(10_000_000, segment).unwrap();

        let mut doc = Document::new(b"1".to_vec());
        doc.add_field("title", FieldValue::Text("hello world hello".to_string()));
        let analyzed = vec![analyze_default("title", "hello world hello")];
        writer.index_document(AddOperation { opstamp: 0, document: doc, analyzed_fields: analyzed }).unwrap();

        assert_eq!(writer.num_docs(), 1);
        let data = writer.finalize().unwrap();
        assert_eq!(data.num_docs, 1);
        let hello = data.fields.get("title").unwrap().find(b"hello").unwrap();
        assert_eq!(hello.postings[0].term_freq, 2);
    }
}
