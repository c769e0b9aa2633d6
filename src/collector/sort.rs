use std::cmp::Ordering;

use crate::common::types::{DocId, ScoreType};
use crate::index::SegmentReader;

/// What a single sort term ranks on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    /// BM25 relevance, as produced by the query being collected.
    Score,
    /// Doc id within the segment, used mostly as a deterministic tiebreak.
    DocId,
    /// A stored doc-value field, read the same way `RangeQuery` reads one.
    Field(String),
}

/// One component of a [`SortOrder`]: a field plus the direction to sort it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortTerm {
    pub field: SortField,
    pub ascending: bool,
}

/// An ordered list of sort terms, most significant first. Empty orders and
/// orders that don't mention `Score` still rank deterministically, since
/// [`compute_key`](SortOrder::compute_key) always appends a hit-number
/// tiebreak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder(Vec<SortTerm>);

impl SortOrder {
    pub fn new(terms: Vec<SortTerm>) -> SortOrder {
        SortOrder(terms)
    }

    /// Descending relevance, the default a bare `TopN(size, skip)` request
    /// gets when no explicit sort is given.
    pub fn by_score() -> SortOrder {
        SortOrder(vec![SortTerm { field: SortField::Score, ascending: false }])
    }

    /// Parses a lucene/bluge-style sort spec: comma-separated field names,
    /// each optionally prefixed with `-` for descending. `_score` names
    /// relevance. `"rank,-_score"` sorts ascending by the `rank` field, then
    /// descending by score to break ties.
    pub fn parse(spec: &str) -> SortOrder {
        let terms = spec
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|term| {
                let (ascending, name) = match term.strip_prefix('-') {
                    Some(rest) => (false, rest),
                    None => (true, term),
                };
                let field = match name {
                    "_score" => SortField::Score,
                    "_doc" => SortField::DocId,
                    other => SortField::Field(other.to_string()),
                };
                SortTerm { field, ascending }
            })
            .collect();
        SortOrder(terms)
    }

    pub fn terms(&self) -> &[SortTerm] {
        &self.0
    }

    /// Builds this match's sort key: one oriented component per term, plus a
    /// trailing hit-number component. Orienting a term (negating it when
    /// ascending) means every component can be compared the same way:
    /// greater always ranks first, so `SortKey`'s own `Ord` needs no outside
    /// context.
    pub(crate) fn compute_key(&self, reader: &SegmentReader, doc: DocId, score: ScoreType, hit_number: u64) -> SortKey {
        let mut values = Vec::with_capacity(self.0.len() + 1);
        for term in &self.0 {
            let raw = match &term.field {
                SortField::Score => score as f64,
                SortField::DocId => doc as f64,
                SortField::Field(name) => reader.doc_value(name, doc).unwrap_or(f64::NEG_INFINITY),
            };
            values.push(if term.ascending { -raw } else { raw });
        }
        // Ascending hit number, independent of every term's direction, so
        // ties land in the order they were encountered.
        values.push(-(hit_number as f64));
        SortKey(values)
    }
}

impl Default for SortOrder {
    fn default() -> SortOrder {
        SortOrder::by_score()
    }
}

/// A match's position under a [`SortOrder`]: oriented component values plus
/// a trailing hit-number tiebreak, compared lexicographically so "greater is
/// better" holds regardless of the underlying fields' directions.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SortKey(Vec<f64>);

impl SortKey {
    #[cfg(test)]
    pub(crate) fn from_raw(values: Vec<f64>) -> SortKey {
        SortKey(values)
    }

    /// Full lexicographic order, hit number included. This is what makes
    /// `DocumentMatch`'s `Ord` a total, deterministic order within one
    /// collection pass.
    pub(crate) fn total_cmp(&self, other: &SortKey) -> Ordering {
        cmp_prefix(&self.0, &other.0, self.0.len())
    }

    /// Order over just the substantive sort terms, hit number excluded.
    /// Used for search-after filtering: two matches from independent scans
    /// can share a primary key even though their hit numbers (assigned
    /// within each scan separately) mean nothing relative to each other.
    fn primary_cmp(&self, other: &SortKey) -> Ordering {
        let n = self.0.len().saturating_sub(1).min(other.0.len().saturating_sub(1));
        cmp_prefix(&self.0, &other.0, n)
    }

    /// Whether this match should be kept when paginating past `cursor`:
    /// strictly worse than the cursor under the primary (non-hit-number)
    /// sort terms.
    pub(crate) fn ranks_after(&self, cursor: &SortKey) -> bool {
        self.primary_cmp(cursor) == Ordering::Less
    }
}

fn cmp_prefix(a: &[f64], b: &[f64], n: usize) -> Ordering {
    for i in 0..n {
        match a[i].partial_cmp(&b[i]) {
            Some(Ordering::Equal) | None => continue,
            Some(ord) => return ord,
        }
    }
    Ordering::Equal
}

/// Opaque cursor for `TopNAfter`-style pagination, obtained from a previous
/// [`DocumentMatch`](super::DocumentMatch) via
/// [`DocumentMatch::search_after`](super::DocumentMatch::search_after).
#[derive(Debug, Clone)]
pub struct SearchAfter(pub(crate) SortKey);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_direction_and_score_alias() {
        let order = SortOrder::parse("-rank,_score");
        assert_eq!(
            order.terms(),
            &[
                SortTerm { field: SortField::Field("rank".to_string()), ascending: false },
                SortTerm { field: SortField::Score, ascending: true },
            ]
        );
    }

    #[test]
    fn total_cmp_breaks_ties_by_hit_number() {
        let a = SortKey(vec![5.0, -1.0]);
        let b = SortKey(vec![5.0, -2.0]);
        assert_eq!(a.total_cmp(&b), Ordering::Greater);
    }

    #[test]
    fn ranks_after_ignores_hit_number() {
        let cursor = SortKey(vec![5.0, -1.0]);
        let same_primary_later_hit = SortKey(vec![5.0, -99.0]);
        assert!(!same_primary_later_hit.ranks_after(&cursor));

        let strictly_worse = SortKey(vec![4.0, -1.0]);
        assert!(strictly_worse.ranks_after(&cursor));
    }
}
