//! Relevance scoring: a pluggable [`Similarity`] (BM25 by default) fed by
//! the per-field, per-doc quantized norms `SegmentWriter` precomputes at
//! index time.

pub mod bm25;
pub mod norm;

pub use bm25::Bm25Similarity;
pub use norm::{DefaultNormCalc, NormCalc};

use crate::common::types::ScoreType;

/// Scores one term match against a document.
///
/// `field_len`/`avg_field_len` are already decoded from the stored `u8`
/// norm via a [`NormCalc`]; implementations don't see the raw byte.
pub trait Similarity: Send + Sync {
    fn score(&self, term_freq: u32, field_len: f32, avg_field_len: f32, doc_freq: u32, num_docs: u32) -> ScoreType;
}
