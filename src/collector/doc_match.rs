use super::sort::{SearchAfter, SortKey};
use crate::common::types::{DocId, ScoreType};
use crate::SegmentOrdinal;

/// One scored match, identified by the segment it came from plus its local
/// doc id, the pair a caller needs to resolve back to a `Document` via
/// `Searcher::segment_reader(segment_ord).stored_fields(doc)`.
///
/// Ranking is driven entirely by `sort_key`, not by `score` directly: `score`
/// is carried along for callers that want the raw relevance value, but a
/// request sorted by a field ranks matches by that field, not by score.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMatch {
    pub segment_ord: SegmentOrdinal,
    pub doc: DocId,
    pub score: ScoreType,
    pub(crate) sort_key: SortKey,
}

impl DocumentMatch {
    pub(crate) fn new(segment_ord: SegmentOrdinal, doc: DocId, score: ScoreType, sort_key: SortKey) -> DocumentMatch {
        DocumentMatch { segment_ord, doc, score, sort_key }
    }

    /// Reassigns which segment this match is reported as coming from,
    /// keeping its score and sort key. Used by `MultiSearch` once a
    /// per-segment collector's local ordinal (always `0`) is remapped to
    /// its real position among the searched segments.
    pub(crate) fn with_segment_ord(mut self, segment_ord: SegmentOrdinal) -> DocumentMatch {
        self.segment_ord = segment_ord;
        self
    }

    /// A cursor capturing this match's position under whatever `SortOrder`
    /// produced it, for a following `TopNAfter` page.
    pub fn search_after(&self) -> SearchAfter {
        SearchAfter(self.sort_key.clone())
    }
}

impl Eq for DocumentMatch {}

impl PartialOrd for DocumentMatch {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocumentMatch {
    /// Greater sort key wins; ties broken by segment then doc id so results
    /// are deterministic across runs (the sort key's own hit-number
    /// component already makes ties rare, but two matches built against
    /// different `SortOrder`s could still collide here in principle).
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key
            .total_cmp(&other.sort_key)
            .then_with(|| self.segment_ord.cmp(&other.segment_ord))
            .then_with(|| self.doc.cmp(&other.doc))
    }
}
