use super::Similarity;
use crate::common::types::ScoreType;

/// Okapi BM25, the standard similarity for text search (tantivy, Lucene and
/// most everyone else default to `k1 = 1.2`, `b = 0.75`).
#[derive(Debug, Clone, Copy)]
pub struct Bm25Similarity {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Similarity {
    fn default() -> Self {
        Bm25Similarity { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Similarity {
    /// `ln(1 + (N - df + 0.5) / (df + 0.5))`, the BM25 inverse document
    /// frequency term. Always positive for `df <= N`.
    pub fn idf(doc_freq: u32, num_docs: u32) -> f32 {
        let n = num_docs as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

impl Similarity for Bm25Similarity {
    fn score(&self, term_freq: u32, field_len: f32, avg_field_len: f32, doc_freq: u32, num_docs: u32) -> ScoreType {
        let tf = term_freq as f32;
        let length_ratio = if avg_field_len > 0.0 { field_len / avg_field_len } else { 1.0 };
        let idf = Self::idf(doc_freq, num_docs);
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * length_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_term_freq_scores_higher() {
        let bm25 = Bm25Similarity::default();
        let low = bm25.score(1, 10.0, 10.0, 5, 100);
        let high = bm25.score(5, 10.0, 10.0, 5, 100);
        assert!(high > low);
    }

    #[test]
    fn test_rarer_term_scores_higher() {
        let bm25 = Bm25Similarity::default();
        let common = bm25.score(2, 10.0, 10.0, 80, 100);
        let rare = bm25.score(2, 10.0, 10.0, 2, 100);
        assert!(rare > common);
    }

    #[test]
    fn test_longer_field_scores_lower_for_same_term_freq() {
        let bm25 = Bm25Similarity::default();
        let short = bm25.score(2, 5.0, 10.0, 5, 100);
        let long = bm25.score(2, 30.0, 10.0, 5, 100);
        assert!(short > long);
    }
}
