use std::sync::Arc;

use super::{DisjunctionSearcher, Query, Searcher, TermSearcher};
use crate::index::SegmentReader;
use crate::scoring::{Bm25Similarity, Similarity};

/// Matches every doc whose `field` holds a term starting with `prefix`,
/// scored as the disjunction of each matching term.
pub struct PrefixQuery {
    field: String,
    prefix: Vec<u8>,
    similarity: Arc<dyn Similarity>,
}

impl PrefixQuery {
    pub fn new(field: impl Into<String>, prefix: Vec<u8>) -> PrefixQuery {
        PrefixQuery { field: field.into(), prefix, similarity: Arc::new(Bm25Similarity::default()) }
    }
}

impl Query for PrefixQuery {
    fn searcher<'s>(&self, reader: &'s SegmentReader) -> crate::Result<Box<dyn Searcher + 's>> {
        let children: Vec<Box<dyn Searcher>> = match reader.field_dictionary(&self.field) {
            Some(dict) => dict
                .terms_with_prefix(&self.prefix)
                .map(|term_postings| {
                    Box::new(TermSearcher::open(reader, &self.field, &term_postings.term, self.similarity.clone()))
                        as Box<dyn Searcher>
                })
                .collect(),
            None => Vec::new(),
        };
        Ok(Box::new(PrefixSearcher(DisjunctionSearcher::new(children))))
    }
}

/// Thin wrapper over a `DisjunctionSearcher` of per-term `TermSearcher`s,
/// kept as a distinct type so callers can name it per the query algebra.
pub struct PrefixSearcher(DisjunctionSearcher);

impl Searcher for PrefixSearcher {
    fn next(&mut self) -> Option<crate::common::types::DocId> {
        self.0.next()
    }
    fn advance(&mut self, target: crate::common::types::DocId) -> Option<crate::common::types::DocId> {
        self.0.advance(target)
    }
    fn doc(&self) -> Option<crate::common::types::DocId> {
        self.0.doc()
    }
    fn score(&self) -> crate::common::types::ScoreType {
        self.0.score()
    }
    fn doc_match_pool_size(&self) -> usize {
        self.0.doc_match_pool_size()
    }
    fn close(&mut self) {
        self.0.close()
    }
}
