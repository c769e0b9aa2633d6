//! Drives one segment's matches through scoring, sort-key computation,
//! aggregation and bounded-store insertion.
//!
//! State "written by multiple pipeline stages without synchronisation
//! beyond channel semantics" is a known sharp edge; wiring these stages as
//! channel-connected tasks would reproduce exactly that hazard for no
//! observable benefit, since every stage here is a pure function of the
//! previous one's output. They run sequentially in one loop instead, see
//! DESIGN.md.

use super::cancellation::{CancellationToken, CHECK_DONE_EVERY};
use super::doc_match::DocumentMatch;
use super::sort::{SortKey, SortOrder};
use super::store::BoundedStore;
use crate::common::errors::SearchError;
use crate::index::SegmentReader;
use crate::query::Query;
use crate::SegmentOrdinal;

#[allow(clippy::too_many_arguments)]
pub(crate) fn collect_segment(
    query: &dyn Query,
    reader: &SegmentReader,
    segment_ord: SegmentOrdinal,
    sort: &SortOrder,
    search_after: Option<&SortKey>,
    store: &mut BoundedStore,
    hit_number: &mut u64,
    cancellation: &CancellationToken,
) -> crate::Result<()> {
    let mut searcher = query.searcher(reader)?;
    let mut since_check = 0usize;

    while let Some(doc) = searcher.next() {
        // stage 1: score the current doc.
        let score = searcher.score();

        // stage 2: load-doc-values + compute-sort. Reaches into the
        // segment's doc-values column for any field-based sort term and
        // folds in a hit-number tiebreak; scoring-only requests never touch
        // doc values at all.
        *hit_number += 1;
        let sort_key = sort.compute_key(reader, doc, score, *hit_number);

        // stage 3: consume-aggregations. No aggregation buckets are wired
        // up; this is the seam where a root bucket would fold the match in
        // before the compare-and-store step below.

        // stage 4: compare-and-store. Search-after drops anything not
        // strictly past the cursor; the threshold check then skips the
        // insert outright if the store is full and this match can't beat
        // its current floor.
        let passes_search_after = search_after.map(|after| sort_key.ranks_after(after)).unwrap_or(true);
        if passes_search_after {
            let passes_threshold =
                store.threshold().map(|t| sort_key.total_cmp(t) == std::cmp::Ordering::Greater).unwrap_or(true);
            if passes_threshold {
                store.insert(DocumentMatch::new(segment_ord, doc, score, sort_key));
            }
        }

        // cooperative cancellation check.
        since_check += 1;
        if since_check >= CHECK_DONE_EVERY {
            since_check = 0;
            if cancellation.is_cancelled() {
                searcher.close();
                return Err(SearchError::Cancelled);
            }
        }
    }
    searcher.close();
    Ok(())
}
