//! Top-N collection: takes a [`Query`](crate::query::Query) and a set of
//! segments and produces a ranked, bounded list of matches.
//!
//! Grounded on `Searcher::search_with_executor`'s fan-out (`reader/searcher.rs`)
//! and its `TopK::combine` merge step, generalized from brute-force vector
//! scoring to the pull-based query algebra in `query/`.

mod cancellation;
mod doc_match;
mod multi_search;
mod pipeline;
mod sort;
mod store;
mod top_n;

pub use cancellation::{CancellationToken, CHECK_DONE_EVERY};
pub use doc_match::DocumentMatch;
pub use multi_search::MultiSearch;
pub use sort::{SearchAfter, SortField, SortOrder, SortTerm};
pub use store::BoundedStore;
pub use top_n::TopNCollector;
