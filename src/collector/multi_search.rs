//! Fans a single query out across many segments concurrently, then merges
//! each segment's local top-k into one global ranking.

use log::warn;

use super::doc_match::DocumentMatch;
use super::sort::SortOrder;
use super::store::BoundedStore;
use super::top_n::TopNCollector;
use crate::common::executor::Executor;
use crate::index::SegmentReader;
use crate::query::Query;
use crate::SegmentOrdinal;

/// Runs a query across many segments through an [`Executor`], merging each
/// segment's local top-k into one global ranking.
///
/// How much of the fan-out actually runs concurrently is a property of the
/// `Executor` passed in, not of this type; callers typically build it via
/// `Executor::multi_thread(config.multi_search_concurrency, ..)`.
///
/// A segment whose search fails (a corrupted postings list, say) logs the
/// error and contributes no matches rather than failing the whole query:
/// one unhealthy segment shouldn't blank out results from the rest of an
/// otherwise healthy index.
pub struct MultiSearch {
    size: usize,
    skip: usize,
    sort: SortOrder,
}

impl MultiSearch {
    pub fn new(size: usize) -> MultiSearch {
        MultiSearch::with_skip(size, 0)
    }

    pub fn with_skip(size: usize, skip: usize) -> MultiSearch {
        MultiSearch::with_sort(size, skip, SortOrder::by_score())
    }

    pub fn with_sort(size: usize, skip: usize, sort: SortOrder) -> MultiSearch {
        MultiSearch { size, skip, sort }
    }

    pub fn search(
        &self,
        query: &dyn Query,
        segment_readers: &[SegmentReader],
        executor: &Executor,
    ) -> crate::Result<Vec<DocumentMatch>> {
        let capacity = self.size + self.skip;

        let per_segment: Vec<Vec<DocumentMatch>> = executor.map(
            |(ord, reader): (usize, &SegmentReader)| -> crate::Result<Vec<DocumentMatch>> {
                let collector = TopNCollector::with_sort(capacity, 0, self.sort.clone());
                match collector.search(query, std::slice::from_ref(reader)) {
                    Ok(matches) => {
                        Ok(matches.into_iter().map(|m| m.with_segment_ord(ord as SegmentOrdinal)).collect())
                    }
                    Err(err) => {
                        warn!("segment {ord} search failed, skipping: {err}");
                        Ok(Vec::new())
                    }
                }
            },
            segment_readers.iter().enumerate(),
        )?;

        let mut store = BoundedStore::new(capacity);
        for matches in per_segment {
            for m in matches {
                store.insert(m);
            }
        }
        let mut results = store.into_sorted_vec();
        if self.skip > 0 {
            results.drain(..self.skip.min(results.len()));
        }
        results.truncate(self.size);
        Ok(results)
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
    use crate::query::TermQuery;

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
    fn test_multi_search_merges_across_segments() {
        let readers = vec![
            build_reader(&["rust rust rust", "rust"]),
            build_reader(&["rust rust"]),
        ];
        let query = TermQuery::new("body", b"rust".to_vec());
        let multi = MultiSearch::new(10);
        let executor = Executor::single_thread();
        let results = multi.search(&query, &readers, &executor).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_multi_search_respects_size() {
        let readers = vec![build_reader(&["a a a", "a a", "a"]), build_reader(&["a a a a"])];
        let query = TermQuery::new("body", b"a".to_vec());
        let multi = MultiSearch::new(2);
        let executor = Executor::single_thread();
        let results = multi.search(&query, &readers, &executor).unwrap();
        assert_eq!(results.len(), 2);
    }
}
