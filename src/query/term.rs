use std::sync::Arc;

use super::{Query, Searcher};
use crate::common::types::{DocId, ScoreType};
use crate::index::codec::PostingEntry;
use crate::index::SegmentReader;
use crate::scoring::{Bm25Similarity, Similarity};

/// Matches every doc posting `term` in `field`, scored with `similarity`.
pub struct TermQuery {
    field: String,
    term: Vec<u8>,
    similarity: Arc<dyn Similarity>,
}

impl TermQuery {
    pub fn new(field: impl Into<String>, term: Vec<u8>) -> TermQuery {
        TermQuery { field: field.into(), term, similarity: Arc::new(Bm25Similarity::default()) }
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> TermQuery {
        self.similarity = similarity;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn term(&self) -> &[u8] {
        &self.term
    }
}

impl Query for TermQuery {
    fn searcher<'s>(&self, reader: &'s SegmentReader) -> crate::Result<Box<dyn Searcher + 's>> {
        Ok(Box::new(TermSearcher::open(reader, &self.field, &self.term, self.similarity.clone())))
    }
}

/// Walks one term's postings in doc order, skipping docs the segment's
/// `AliveBitSet` marks deleted.
pub struct TermSearcher<'s> {
    reader: &'s SegmentReader,
    field: String,
    postings: &'s [PostingEntry],
    cursor: usize,
    doc_freq: u32,
    num_docs: u32,
    avg_field_len: f32,
    similarity: Arc<dyn Similarity>,
}

impl<'s> TermSearcher<'s> {
    pub(crate) fn open(reader: &'s SegmentReader, field: &str, term: &[u8], similarity: Arc<dyn Similarity>) -> TermSearcher<'s> {
        let postings: &'s [PostingEntry] =
            reader.term_postings(field, term).map(|tp| tp.postings.as_slice()).unwrap_or(&[]);
        let doc_freq = postings.len() as u32;
        let num_docs = reader.num_alive_docs().max(1);
        let avg_field_len = average_field_len(reader, field);
        TermSearcher { reader, field: field.to_string(), postings, cursor: 0, doc_freq, num_docs, avg_field_len, similarity }
    }

    /// Term frequency of the current doc, or 0 if exhausted.
    pub fn term_freq(&self) -> u32 {
        self.postings.get(self.cursor).map(|p| p.term_freq).unwrap_or(0)
    }

    fn skip_deleted(&mut self) {
        while let Some(entry) = self.postings.get(self.cursor) {
            if self.reader.is_deleted(entry.doc) {
                self.cursor += 1;
            } else {
                break;
            }
        }
    }
}

/// Averages the decoded field length across alive docs; `0` docs (an empty
/// segment, or a field nobody populated) fall back to `1.0` so BM25's ratio
/// doesn't divide by zero.
fn average_field_len(reader: &SegmentReader, field: &str) -> f32 {
    let mut total = 0u64;
    let mut count = 0u64;
    for doc in 0..reader.num_docs() {
        if reader.is_deleted(doc) {
            continue;
        }
        total += reader.norm(field, doc) as u64;
        count += 1;
    }
    if count == 0 {
        1.0
    } else {
        total as f32 / count as f32
    }
}

impl<'s> Searcher for TermSearcher<'s> {
    fn next(&mut self) -> Option<DocId> {
        if self.cursor < self.postings.len() {
            self.cursor += 1;
        }
        self.skip_deleted();
        self.doc()
    }

    fn advance(&mut self, target: DocId) -> Option<DocId> {
        while let Some(entry) = self.postings.get(self.cursor) {
            if entry.doc >= target {
                break;
            }
            self.cursor += 1;
        }
        self.skip_deleted();
        self.doc()
    }

    fn doc(&self) -> Option<DocId> {
        self.postings.get(self.cursor).map(|entry| entry.doc)
    }

    fn score(&self) -> ScoreType {
        let field_len = self.reader.norm(&self.field, self.doc().unwrap_or(0)) as f32;
        self.similarity.score(self.term_freq(), field_len, self.avg_field_len, self.doc_freq, self.num_docs)
    }

    fn doc_match_pool_size(&self) -> usize {
        self.postings.len().saturating_sub(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::schema::{analyze_default, Document, FieldType, FieldValue, Schema};
    use crate::index::{IndexBuilder, IndexSettings};
    use crate::indexer::segment_writer::SegmentWriter;
    use crate::indexer::operation::AddOperation;
    use crate::index::codec::{Codec, DefaultCodec};

    fn build_reader(docs: &[&str]) -> SegmentReader {
        let schema = Schema::builder()
            .add_field("body", FieldType::Text { indexed: true, stored: false, term_vectors: false })
            .build();
        let settings = IndexSettings { schema, ..Default::default() };
        let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
        let segment = index.new_segment();
        let mut writer = SegmentWriter::for_segment(10_000_000, segment.clone()).unwrap();
        for (i, text) in docs.iter().enumerate() {
            let mut doc = Document::new(format!("doc-{i}").into_bytes());
            doc.add_field("body", FieldValue::Text(text.to_string()));
            let analyzed = vec![analyze_default("body", text)];
            writer.index_document(AddOperation { opstamp: i as u64, document: doc, analyzed_fields: analyzed }).unwrap();
        }
        let data = writer.finalize().unwrap();
        DefaultCodec.write_segment(index.directory(), segment.id(), &data).unwrap();
        SegmentReader::open(&segment).unwrap()
    }

    #[test]
    fn test_term_searcher_iterates_matching_docs_in_order() {
        let reader = build_reader(&["the cat sat", "a dog ran", "the cat ran"]);
        let query = TermQuery::new("body", b"cat".to_vec());
        let mut searcher = query.searcher(&reader).unwrap();
        assert_eq!(searcher.next(), Some(0));
        assert_eq!(searcher.next(), Some(2));
        assert_eq!(searcher.next(), None);
    }

    #[test]
    fn test_term_searcher_scores_are_positive() {
        let reader = build_reader(&["the cat sat", "a dog ran", "the cat ran"]);
        let query = TermQuery::new("body", b"cat".to_vec());
        let mut searcher = query.searcher(&reader).unwrap();
        searcher.next();
        assert!(searcher.score() > 0.0);
    }
}
