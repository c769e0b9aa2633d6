use std::ops::Bound;

use super::{Query, Searcher};
use crate::common::types::DocId;
use crate::index::SegmentReader;

/// Matches every doc whose `field` doc-value falls within `[lower, upper]`.
/// Unscored, used as a filter, composed into a `BooleanQuery` alongside a
/// scoring clause when relevance still matters.
pub struct RangeQuery {
    field: String,
    lower: Bound<f64>,
    upper: Bound<f64>,
}

impl RangeQuery {
    pub fn new(field: impl Into<String>, lower: Bound<f64>, upper: Bound<f64>) -> RangeQuery {
        RangeQuery { field: field.into(), lower, upper }
    }
}

impl Query for RangeQuery {
    fn searcher<'s>(&self, reader: &'s SegmentReader) -> crate::Result<Box<dyn Searcher + 's>> {
        Ok(Box::new(RangeSearcher { reader, field: self.field.clone(), matches: Box::new(self.matching_fn()), cursor: None }))
    }
}

impl RangeQuery {
    fn matching_fn(&self) -> impl Fn(f64) -> bool + Send + Sync + 'static {
        let lower = self.lower;
        let upper = self.upper;
        move |value| {
            let above_lower = match lower {
                Bound::Included(l) => value >= l,
                Bound::Excluded(l) => value > l,
                Bound::Unbounded => true,
            };
            let below_upper = match upper {
                Bound::Included(u) => value <= u,
                Bound::Excluded(u) => value < u,
                Bound::Unbounded => true,
            };
            above_lower && below_upper
        }
    }
}

/// Scans the field's doc-values column in doc-id order, which is the only
/// access pattern `SegmentData::doc_values` supports; there is no separate
/// sorted range index to binary search into.
pub struct RangeSearcher<'s> {
    reader: &'s SegmentReader,
    field: String,
    matches: Box<dyn Fn(f64) -> bool + Send + Sync>,
    cursor: Option<DocId>,
}

impl<'s> RangeSearcher<'s> {
    fn find_from(&self, start: DocId) -> Option<DocId> {
        (start..self.reader.num_docs()).find(|&doc| {
            !self.reader.is_deleted(doc)
                && self.reader.doc_value(&self.field, doc).map(|v| (self.matches)(v)).unwrap_or(false)
        })
    }
}

impl<'s> Searcher for RangeSearcher<'s> {
    fn next(&mut self) -> Option<DocId> {
        let start = self.cursor.map(|d| d + 1).unwrap_or(0);
        self.cursor = self.find_from(start);
        self.cursor
    }

    fn advance(&mut self, target: DocId) -> Option<DocId> {
        self.cursor = self.find_from(target);
        self.cursor
    }

    fn doc(&self) -> Option<DocId> {
        self.cursor
    }
}
