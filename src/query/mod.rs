//! Query algebra: a pull-based `Searcher` per segment, generalized from the
//! teacher's exhaustive per-segment vector scan (`reader::searcher::Searcher::
//! search_with_executor`) into a sorted doc-id iterator queries can compose
//! (conjunction, disjunction, phrase, prefix, range, boolean) instead of
//! scanning every document.

mod boolean;
mod conjunction;
mod disjunction;
mod phrase;
mod prefix;
mod range;
mod term;

pub use boolean::{BooleanQuery, BooleanSearcher, Occur};
pub use conjunction::ConjunctionSearcher;
pub use disjunction::DisjunctionSearcher;
pub use phrase::{PhraseQuery, PhraseSearcher};
pub use prefix::{PrefixQuery, PrefixSearcher};
pub use range::{RangeQuery, RangeSearcher};
pub use term::{TermQuery, TermSearcher};

use crate::common::types::{DocId, ScoreType};
use crate::index::SegmentReader;

/// A sorted, pull-based iterator over the docs one query matches within a
/// single segment. `next`/`advance` move strictly forward; `score` reflects
/// whatever doc the searcher is currently positioned on.
pub trait Searcher: Send {
    /// Moves to the next matching doc. Returns `None` once exhausted, after
    /// which every other method must also return `None`/0.
    fn next(&mut self) -> Option<DocId>;

    /// Moves to the first matching doc `>= target`. `target` must not be
    /// smaller than the current position. Implementations that can't skip
    /// cheaply fall back to repeated `next()` calls.
    fn advance(&mut self, target: DocId) -> Option<DocId>;

    /// The doc this searcher is currently positioned on, if any.
    fn doc(&self) -> Option<DocId>;

    /// Relevance contribution for the current doc. Searchers with no
    /// notion of relevance (e.g. a bare range filter) return 0.0.
    fn score(&self) -> ScoreType {
        0.0
    }

    /// Upper bound on the number of docs this searcher can still produce,
    /// used by the collector to size its result pool ahead of time.
    fn doc_match_pool_size(&self) -> usize {
        0
    }

    /// Exhausts the searcher, returning how many docs matched.
    fn count(&mut self) -> u32 {
        let mut n = 0;
        while self.next().is_some() {
            n += 1;
        }
        n
    }

    /// Releases resources ahead of drop; most searchers have nothing to do.
    fn close(&mut self) {}
}

/// Produces a [`Searcher`] bound to one segment.
pub trait Query: Send + Sync {
    fn searcher<'s>(&self, reader: &'s SegmentReader) -> crate::Result<Box<dyn Searcher + 's>>;
}

/// Steps `searcher` forward from its current position until it matches
/// `target` or passes it, without requiring the caller already be
/// positioned. Used by searchers composing children that don't all start
/// at the same doc.
pub(crate) fn advance_to_or_past(searcher: &mut dyn Searcher, target: DocId) -> Option<DocId> {
    match searcher.doc() {
        Some(doc) if doc >= target => Some(doc),
        _ => searcher.advance(target),
    }
}
