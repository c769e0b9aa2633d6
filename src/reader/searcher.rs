use std::collections::BTreeMap;
use std::sync::Arc;
use std::{fmt, io};

use census::TrackedObject;

use crate::collector::{DocumentMatch, MultiSearch, SearchAfter, SortOrder, TopNCollector};
use crate::common::executor::Executor;
use crate::index::schema::Document;
use crate::index::{Index, SegmentId, SegmentReader};
use crate::query::Query;
use crate::common::types::DocId;
use crate::{Opstamp, SegmentOrdinal};

/// Identifies the searcher generation accessed by a [`Searcher`].
///
/// While this might seem redundant, a [`SearcherGeneration`] contains
/// both a `generation_id` AND a list of `(SegmentId, DeleteOpstamp)`.
///
/// This is on purpose. This object is used by the [`Warmer`](crate::reader::Warmer) API.
/// Having both information makes it possible to identify which
/// artifact should be refreshed or garbage collected.
///
/// Depending on the use case, `Warmer`'s implementers can decide to
/// produce artifacts per:
/// - `generation_id` (e.g. some searcher level aggregates)
/// - `(segment_id, delete_opstamp)` (e.g. segment level aggregates)
/// - `segment_id` (e.g. for immutable document level information)
/// - `(generation_id, segment_id)` (e.g. for consistent dynamic column)
/// - ...
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearcherGeneration {
    segments: BTreeMap<SegmentId, Option<Opstamp>>,
    generation_id: u64,
}

impl SearcherGeneration {
    pub(crate) fn from_segment_readers(segment_readers: &[SegmentReader], generation_id: u64) -> Self {
        let mut segment_id_to_del_opstamp = BTreeMap::new();
        for segment_reader in segment_readers {
            segment_id_to_del_opstamp.insert(segment_reader.segment_id(), None);
        }
        Self { segments: segment_id_to_del_opstamp, generation_id }
    }

    pub fn generation_id(&self) -> u64 {
        self.generation_id
    }

    pub fn segments(&self) -> &BTreeMap<SegmentId, Option<Opstamp>> {
        &self.segments
    }
}

/// Holds a list of `SegmentReader`s ready for search.
///
/// It guarantees that the `Segment` will not be removed before
/// the destruction of the `Searcher`.
#[derive(Clone)]
pub struct Searcher {
    inner: Arc<SearcherInner>,
}

impl Searcher {
    /// The `Index` this searcher was loaded from.
    pub fn index(&self) -> &Index {
        &self.inner.index
    }

    /// The generation this searcher is pinned to, stable for its whole
    /// lifetime even if the index keeps committing.
    pub fn generation(&self) -> &SearcherGeneration {
        self.inner.generation.as_ref()
    }

    /// Total alive docs across every segment this searcher holds.
    pub fn num_docs(&self) -> u64 {
        self.inner.segment_readers.iter().map(|r| u64::from(r.num_alive_docs())).sum()
    }

    /// Return all [`SegmentReader`] held by current [`Searcher`]
    pub fn segment_readers(&self) -> &[SegmentReader] {
        &self.inner.segment_readers
    }

    /// Get [`SegmentReader`] with given `segment idx`.
    pub fn segment_reader(&self, segment_ord: u32) -> &SegmentReader {
        &self.inner.segment_readers[segment_ord as usize]
    }

    /// Resolves a `DocumentMatch` back to its stored fields, if the field
    /// this match's doc belongs to was indexed with `stored: true`.
    pub fn doc(&self, doc_match: &DocumentMatch) -> Option<&Document> {
        self.segment_reader(doc_match.segment_ord).stored_fields(doc_match.doc)
    }

    /// Runs `query` on the calling thread and returns the top `size` matches.
    pub fn search(&self, query: &dyn Query, size: usize) -> crate::Result<Vec<DocumentMatch>> {
        TopNCollector::new(size).search(query, self.segment_readers())
    }

    /// Same as [`search`](Searcher::search), but lets the caller skip ahead
    /// (pagination) and cancel the query early.
    pub fn search_with_collector(&self, query: &dyn Query, collector: &TopNCollector) -> crate::Result<Vec<DocumentMatch>> {
        collector.search(query, self.segment_readers())
    }

    /// Runs `query` on the calling thread, ordered by `sort` instead of
    /// relevance, returning the top `size` matches after skipping `skip`.
    pub fn search_sorted(
        &self,
        query: &dyn Query,
        size: usize,
        skip: usize,
        sort: SortOrder,
    ) -> crate::Result<Vec<DocumentMatch>> {
        TopNCollector::with_sort(size, skip, sort).search(query, self.segment_readers())
    }

    /// Runs `query` on the calling thread, returning the `size` matches that
    /// rank strictly past `after` under `sort`. `after` must come from a
    /// match produced under the same `sort` order, typically via
    /// [`DocumentMatch::search_after`].
    pub fn search_after(
        &self,
        query: &dyn Query,
        size: usize,
        sort: SortOrder,
        after: SearchAfter,
    ) -> crate::Result<Vec<DocumentMatch>> {
        TopNCollector::top_n_after(size, sort, after).search(query, self.segment_readers())
    }

    /// Runs `query` fanned out over `executor`, one task per segment.
    ///
    /// The current implementation is rather naive: multithreading is by
    /// splitting search into as many tasks as there are segments. It is
    /// powerless at making search faster if your index consists of one
    /// large segment, and multithreading a single query will not improve
    /// your throughput — it can actually hurt it. It will, however,
    /// decrease the average response time.
    pub fn search_with_executor(&self, query: &dyn Query, size: usize, executor: &Executor) -> crate::Result<Vec<DocumentMatch>> {
        MultiSearch::new(size).search(query, self.segment_readers(), executor)
    }

    /// Resolves a global doc ordinal, the sum of every preceding segment's
    /// `num_docs` plus a local offset, back to the `(segment_ord,
    /// local_doc)` pair that actually addresses a doc. Segments are laid out
    /// contiguously in iteration order, so this is a binary search over each
    /// segment's cumulative base offset rather than a linear scan.
    pub fn resolve_global_doc(&self, global_doc: u64) -> Option<(SegmentOrdinal, DocId)> {
        let mut bases = Vec::with_capacity(self.segment_readers().len());
        let mut base = 0u64;
        for reader in self.segment_readers() {
            bases.push(base);
            base += u64::from(reader.num_docs());
        }
        if global_doc >= base {
            return None;
        }
        let ord = bases.partition_point(|&b| b <= global_doc) - 1;
        Some((ord as SegmentOrdinal, (global_doc - bases[ord]) as DocId))
    }
}

impl From<Arc<SearcherInner>> for Searcher {
    fn from(inner: Arc<SearcherInner>) -> Self {
        Searcher { inner }
    }
}

/// Holds a list of `SegmentReader`s ready for search.
///
/// It guarantees that the `Segment` will not be removed before
/// the destruction of the `Searcher`.
pub(crate) struct SearcherInner {
    index: Index,
    segment_readers: Vec<SegmentReader>,
    generation: TrackedObject<SearcherGeneration>,
}

impl SearcherInner {
    pub(crate) fn new(
        index: Index,
        segment_readers: Vec<SegmentReader>,
        generation: TrackedObject<SearcherGeneration>,
    ) -> io::Result<SearcherInner> {
        assert_eq!(
            &segment_readers.iter().map(|reader| (reader.segment_id(), None)).collect::<BTreeMap<_, _>>(),
            generation.segments(),
            "Set of segments referenced by this Searcher and its SearcherGeneration must match"
        );

        Ok(SearcherInner { index, segment_readers, generation })
    }
}

impl fmt::Debug for Searcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segment_ids = self.segment_readers().iter().map(SegmentReader::segment_id).collect::<Vec<_>>();
        write!(f, "Searcher({segment_ids:?})")
    }
}

#[cfg(test)]
mod tests {
    use crate::index::schema::{analyze_default, Document, FieldType, FieldValue, Schema};
    use crate::index::{IndexBuilder, IndexSettings};
    use crate::indexer::NoMergePolicy;

    fn test_schema() -> Schema {
        Schema::builder().add_field("body", FieldType::Text { indexed: true, stored: true, term_vectors: false }).build()
    }

    #[test]
    fn test_resolve_global_doc_across_segments() {
        let settings = IndexSettings { schema: test_schema(), ..Default::default() };
        let index = IndexBuilder::new().with_settings(settings).create_in_ram().unwrap();
        let mut writer = index.writer_for_tests().unwrap();
        writer.set_merge_policy(Box::new(NoMergePolicy));

        for i in 0..3 {
            let mut doc = Document::new(format!("a-{i}").into_bytes());
            doc.add_field("body", FieldValue::Text(format!("doc {i}")));
            writer.add_document(doc, vec![analyze_default("body", &format!("doc {i}"))]).unwrap();
        }
        writer.commit().unwrap();

        for i in 0..2 {
            let mut doc = Document::new(format!("b-{i}").into_bytes());
            doc.add_field("body", FieldValue::Text(format!("doc {i}")));
            writer.add_document(doc, vec![analyze_default("body", &format!("doc {i}"))]).unwrap();
        }
        writer.commit().unwrap();

        let reader = index.reader().unwrap();
        let searcher = reader.searcher();
        assert_eq!(searcher.num_docs(), 5);

        assert_eq!(searcher.resolve_global_doc(0), Some((0, 0)));
        assert_eq!(searcher.resolve_global_doc(2), Some((0, 2)));
        assert_eq!(searcher.resolve_global_doc(3), Some((1, 0)));
        assert_eq!(searcher.resolve_global_doc(4), Some((1, 1)));
        assert_eq!(searcher.resolve_global_doc(5), None);
    }
}
