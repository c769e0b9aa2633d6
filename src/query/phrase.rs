use std::sync::Arc;

use super::{Query, Searcher};
use crate::common::types::{DocId, ScoreType};
use crate::index::codec::PostingEntry;
use crate::index::SegmentReader;
use crate::scoring::{Bm25Similarity, Similarity};

/// Matches docs where every term in `terms` appears, in order, within
/// `slop` positions of consecutive within `field`. `slop` of `0` (the
/// default, via [`PhraseQuery::new`]) requires exact consecutive positions.
pub struct PhraseQuery {
    field: String,
    terms: Vec<Vec<u8>>,
    slop: u32,
    similarity: Arc<dyn Similarity>,
}

impl PhraseQuery {
    pub fn new(field: impl Into<String>, terms: Vec<Vec<u8>>) -> PhraseQuery {
        PhraseQuery { field: field.into(), terms, slop: 0, similarity: Arc::new(Bm25Similarity::default()) }
    }

    /// Allows each term past the first to drift up to `slop` positions from
    /// its exact expected slot, so `"quick ... brown"` with one word between
    /// still matches `PhraseQuery::new("body", ["quick", "brown"]).with_slop(1)`.
    pub fn with_slop(mut self, slop: u32) -> PhraseQuery {
        self.slop = slop;
        self
    }
}

impl Query for PhraseQuery {
    fn searcher<'s>(&self, reader: &'s SegmentReader) -> crate::Result<Box<dyn Searcher + 's>> {
        let postings: Vec<&'s [PostingEntry]> = self
            .terms
            .iter()
            .map(|term| reader.term_postings(&self.field, term).map(|tp| tp.postings.as_slice()).unwrap_or(&[]))
            .collect();
        let doc_freq = postings.iter().map(|p| p.len() as u32).min().unwrap_or(0);
        let num_docs = reader.num_alive_docs().max(1);
        Ok(Box::new(PhraseSearcher {
            reader,
            field: self.field.clone(),
            postings,
            slop: self.slop,
            cursors: vec![0; self.terms.len()],
            current: None,
            current_term_freq: 0,
            doc_freq,
            num_docs,
            similarity: self.similarity.clone(),
        }))
    }
}

/// Walks each term's postings in lockstep, aligning on a common doc via a
/// conjunction-style scan, then checks the positions of that doc's postings
/// for a consecutive run `term[i]` at `position + i`.
pub struct PhraseSearcher<'s> {
    reader: &'s SegmentReader,
    field: String,
    postings: Vec<&'s [PostingEntry]>,
    slop: u32,
    cursors: Vec<usize>,
    current: Option<DocId>,
    current_term_freq: u32,
    doc_freq: u32,
    num_docs: u32,
    similarity: Arc<dyn Similarity>,
}

impl<'s> PhraseSearcher<'s> {
    fn entry_at(&self, term_idx: usize) -> Option<&'s PostingEntry> {
        self.postings[term_idx].get(self.cursors[term_idx])
    }

    /// Counts matches for `doc`, given each term's posting entry for it.
    /// Each term past the first must land, in increasing position order, no
    /// more than `slop` away from its exact expected slot; `slop == 0`
    /// degenerates to requiring strictly consecutive positions.
    fn phrase_matches(entries: &[&PostingEntry], slop: u32) -> u32 {
        let Some(first) = entries.first() else { return 0 };
        let mut matches = 0u32;
        'start: for &start_pos in &first.positions {
            let mut last_pos = start_pos;
            for (i, entry) in entries.iter().enumerate().skip(1) {
                let expected = start_pos + i as u32;
                let low = expected.saturating_sub(slop);
                let high = expected + slop;
                let next = entry.positions.iter().copied().filter(|&p| p > last_pos && p >= low && p <= high).min();
                match next {
                    Some(p) => last_pos = p,
                    None => continue 'start,
                }
            }
            matches += 1;
        }
        matches
    }

    fn find_from(&mut self, mut target: DocId) -> Option<DocId> {
        if self.postings.iter().any(|p| p.is_empty()) {
            return None;
        }
        'outer: loop {
            for term_idx in 0..self.postings.len() {
                while let Some(entry) = self.entry_at(term_idx) {
                    if entry.doc >= target {
                        break;
                    }
                    self.cursors[term_idx] += 1;
                }
                match self.entry_at(term_idx) {
                    Some(entry) if entry.doc == target => continue,
                    Some(entry) => {
                        target = entry.doc;
                        continue 'outer;
                    }
                    None => return None,
                }
            }
            if self.reader.is_deleted(target) {
                target += 1;
                continue;
            }
            let entries: Vec<&PostingEntry> = (0..self.postings.len()).map(|i| self.entry_at(i).unwrap()).collect();
            let term_freq = Self::phrase_matches(&entries, self.slop);
            if term_freq > 0 {
                self.current_term_freq = term_freq;
                return Some(target);
            }
            target += 1;
        }
    }
}

impl<'s> Searcher for PhraseSearcher<'s> {
    fn next(&mut self) -> Option<DocId> {
        let target = self.current.map(|d| d + 1).unwrap_or(0);
        self.current = self.find_from(target);
        self.current
    }

    fn advance(&mut self, target: DocId) -> Option<DocId> {
        self.current = self.find_from(target);
        self.current
    }

    fn doc(&self) -> Option<DocId> {
        self.current
    }

    fn score(&self) -> ScoreType {
        let field_len = self.current.map(|doc| self.reader.norm(&self.field, doc) as f32).unwrap_or(0.0);
        let avg_field_len = field_len.max(1.0);
        self.similarity.score(self.current_term_freq, field_len, avg_field_len, self.doc_freq, self.num_docs)
    }

    fn doc_match_pool_size(&self) -> usize {
        self.postings.iter().map(|p| p.len()).min().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::codec::{Codec, DefaultCodec};
    use crate::index::schema::{analyze_default, Document, FieldType, FieldValue, Schema};
    use crate::index::{IndexBuilder, IndexSettings};
    use crate::indexer::operation::AddOperation;
    use crate::indexer::segment_writer::SegmentWriter;

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
    fn test_phrase_requires_consecutive_positions() {
        let reader = build_reader(&["quick brown fox", "brown quick fox", "the quick brown bear"]);
        let query = PhraseQuery::new("body", vec![b"quick".to_vec(), b"brown".to_vec()]);
        let mut searcher = query.searcher(&reader).unwrap();
        assert_eq!(searcher.next(), Some(0));
        assert_eq!(searcher.next(), Some(2));
        assert_eq!(searcher.next(), None);
    }

    #[test]
    fn test_phrase_with_slop_allows_intervening_words() {
        let reader = build_reader(&["quick brown fox", "quick lazy brown fox", "quick lazy lazy lazy brown fox"]);
        let exact = PhraseQuery::new("body", vec![b"quick".to_vec(), b"brown".to_vec()]);
        let mut searcher = exact.searcher(&reader).unwrap();
        assert_eq!(searcher.next(), Some(0));
        assert_eq!(searcher.next(), None);

        let sloppy = PhraseQuery::new("body", vec![b"quick".to_vec(), b"brown".to_vec()]).with_slop(1);
        let mut searcher = sloppy.searcher(&reader).unwrap();
        assert_eq!(searcher.next(), Some(0));
        assert_eq!(searcher.next(), Some(1));
        assert_eq!(searcher.next(), None);
    }
}
