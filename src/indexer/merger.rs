//! Merges several segments' dictionaries, stored fields, doc values and
//! norms into one, renumbering local doc ids contiguously in reader order
//! and dropping any doc an input segment's `AliveBitSet` marks as deleted.

use std::collections::HashMap;

use log::debug;

use crate::common::types::DocId;
use crate::index::codec::{FieldDictionary, PostingEntry, SegmentData, TermPostings};
use crate::index::schema::{Document, FieldName};
use crate::index::{Index, SegmentReader};
use crate::indexer::segment_entry::SegmentEntry;

pub struct IndexMerger {
    readers: Vec<SegmentReader>,
}

impl IndexMerger {
    pub fn open(index: &Index, segment_entries: &[SegmentEntry]) -> crate::Result<IndexMerger> {
        let readers = segment_entries
            .iter()
            .map(|entry| {
                let segment = index.segment(entry.meta().clone());
                SegmentReader::open(&segment).map(|reader| reader.with_alive_bitset(entry.alive_bitset().cloned()))
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(IndexMerger { readers })
    }

    /// Per reader, the alive docs' new doc id in the merged segment (`None`
    /// for deleted docs); readers are laid out back-to-back in order, so
    /// each reader's assigned range is contiguous and increasing.
    fn doc_id_mappings(&self) -> Vec<Vec<Option<DocId>>> {
        let mut next_doc = 0u32;
        self.readers
            .iter()
            .map(|reader| {
                (0..reader.num_docs())
                    .map(|doc| {
                        if reader.is_deleted(doc) {
                            None
                        } else {
                            let assigned = next_doc;
                            next_doc += 1;
                            Some(assigned)
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn field_names(&self) -> Vec<FieldName> {
        let mut names = Vec::new();
        for reader in &self.readers {
            for name in reader.fields() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Merges every reader's field dictionary. Because reader ranges are
    /// disjoint and increasing, simply concatenating each term's remapped
    /// postings (reader by reader) keeps them doc-id sorted.
    fn merge_field(&self, field: &str, mappings: &[Vec<Option<DocId>>]) -> FieldDictionary {
        let mut term_map: HashMap<Vec<u8>, Vec<PostingEntry>> = HashMap::new();
        for (reader, mapping) in self.readers.iter().zip(mappings) {
            let Some(dict) = reader.field_dictionary(field) else { continue };
            for term_postings in &dict.terms {
                let remapped: Vec<PostingEntry> = term_postings
                    .postings
                    .iter()
                    .filter_map(|posting| {
                        mapping[posting.doc as usize].map(|new_doc| PostingEntry {
                            doc: new_doc,
                            term_freq: posting.term_freq,
                            positions: posting.positions.clone(),
                        })
                    })
                    .collect();
                if !remapped.is_empty() {
                    term_map.entry(term_postings.term.clone()).or_default().extend(remapped);
                }
            }
        }
        let mut terms: Vec<TermPostings> =
            term_map.into_iter().map(|(term, postings)| TermPostings { term, postings }).collect();
        terms.sort_by(|a, b| a.term.cmp(&b.term));
        FieldDictionary { terms }
    }

    pub fn merge(&self) -> crate::Result<SegmentData> {
        let mappings = self.doc_id_mappings();
        let num_docs: u32 = mappings.iter().map(|m| m.iter().filter(|d| d.is_some()).count() as u32).sum();
        let field_names = self.field_names();
        debug!("merging {} segments ({:?}) into {} docs", self.readers.len(), field_names, num_docs);

        let mut fields = HashMap::new();
        for field in &field_names {
            fields.insert(field.clone(), self.merge_field(field, &mappings));
        }

        let mut stored_fields: Vec<Option<Document>> = vec![None; num_docs as usize];
        let mut doc_values: HashMap<FieldName, Vec<Option<f64>>> =
            field_names.iter().map(|f| (f.clone(), vec![None; num_docs as usize])).collect();
        let mut norms: HashMap<FieldName, Vec<u8>> =
            field_names.iter().map(|f| (f.clone(), vec![0u8; num_docs as usize])).collect();

        for (reader, mapping) in self.readers.iter().zip(&mappings) {
            for old_doc in 0..reader.num_docs() {
                let Some(new_doc) = mapping[old_doc as usize] else { continue };
                stored_fields[new_doc as usize] = reader.stored_fields(old_doc).cloned();
                for field in &field_names {
                    if let Some(value) = reader.doc_value(field, old_doc) {
                        doc_values.get_mut(field).unwrap()[new_doc as usize] = Some(value);
                    }
                    norms.get_mut(field).unwrap()[new_doc as usize] = reader.norm(field, old_doc);
                }
            }
        }

        Ok(SegmentData { num_docs, fields, stored_fields, doc_values, norms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::codec::{Codec, DefaultCodec};
    use crate::index::schema::{analyze_default, FieldType, FieldValue, Schema};
    use crate::index::{IndexBuilder, IndexSettings};
    use crate::indexer::SegmentWriter;

    fn schema() -> Schema {
        Schema::builder()
            .add_field("title", FieldType::Text { indexed: true, stored: true, term_vectors: false })
            .build()
    }

    fn write_one_doc(index: &Index, id: &str, text: &str) -> SegmentEntry {
        let segment = index.new_segment();
        let meta = segment.meta().clone();
        let mut writer = SegmentWriter::for_segment(10_000_000, segment.clone()).unwrap();
        let mut doc = Document::new(id.as_bytes().to_vec());
        doc.add_field("title", FieldValue::Text(text.to_string()));
        let analyzed = vec![analyze_default("title", text)];
        writer.index_document(crate::indexer::operation::AddOperation { opstamp: 0, document: doc, analyzed_fields: analyzed }).unwrap();
        let num_docs = writer.num_docs();
        let data = writer.finalize().unwrap();
        DefaultCodec.write_segment(index.directory(), segment.id(), &data).unwrap();
        SegmentEntry::new(meta.with_num_docs(num_docs), None)
    }

    #[test]
    fn test_merge_two_segments_concatenates_postings() {
        let settings = IndexSettings { schema: schema(), ..Default::default() };
        let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();

        let entry_a = write_one_doc(&index, "1", "hello world");
        let entry_b = write_one_doc(&index, "2", "hello there");

        let merger = IndexMerger::open(&index, &[entry_a, entry_b]).unwrap();
        let merged = merger.merge().unwrap();

        assert_eq!(merged.num_docs, 2);
        let hello = merged.fields.get("title").unwrap().find(b"hello").unwrap();
        assert_eq!(hello.postings.len(), 2);
        assert_eq!(hello.postings[0].doc, 0);
        assert_eq!(hello.postings[1].doc, 1);
    }
}
