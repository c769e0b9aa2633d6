use super::{advance_to_or_past, ConjunctionSearcher, DisjunctionSearcher, Query, Searcher};
use crate::common::types::{DocId, ScoreType};
use crate::index::SegmentReader;

/// Whether a `BooleanQuery` clause is required, optional, or excluding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

/// A combination of clauses, each tagged `Must`/`Should`/`MustNot`. At
/// least one `Must` or `Should` clause is required to produce any matches;
/// `MustNot` clauses only ever filter.
pub struct BooleanQuery {
    clauses: Vec<(Occur, Box<dyn Query>)>,
}

impl BooleanQuery {
    pub fn new(clauses: Vec<(Occur, Box<dyn Query>)>) -> BooleanQuery {
        BooleanQuery { clauses }
    }
}

impl Query for BooleanQuery {
    fn searcher<'s>(&self, reader: &'s SegmentReader) -> crate::Result<Box<dyn Searcher + 's>> {
        let mut musts = Vec::new();
        let mut shoulds = Vec::new();
        let mut must_nots = Vec::new();
        for (occur, query) in &self.clauses {
            let searcher = query.searcher(reader)?;
            match occur {
                Occur::Must => musts.push(searcher),
                Occur::Should => shoulds.push(searcher),
                Occur::MustNot => must_nots.push(searcher),
            }
        }
        if musts.is_empty() && shoulds.is_empty() {
            return Err(crate::common::errors::SearchError::InvalidQuery(
                "a BooleanQuery needs at least one Must or Should clause".to_string(),
            ));
        }

        let has_musts = !musts.is_empty();
        let required: Box<dyn Searcher> = if has_musts {
            Box::new(ConjunctionSearcher::new(musts))
        } else {
            Box::new(DisjunctionSearcher::new(Vec::new()))
        };
        let should = if shoulds.is_empty() { None } else { Some(DisjunctionSearcher::new(shoulds)) };
        let should_driven = !has_musts && should.is_some();

        Ok(Box::new(BooleanSearcher {
            required,
            should,
            should_driven,
            must_not: DisjunctionSearcher::new(must_nots),
            current: None,
            current_score: 0.0,
        }))
    }
}

/// Combines a required clause (conjunction of `Must`s, or disjunction of
/// `Should`s if there are no `Must`s) with an optional scoring-only
/// disjunction of `Should`s and an exclusion disjunction of `MustNot`s.
pub struct BooleanSearcher {
    required: Box<dyn Searcher>,
    should: Option<DisjunctionSearcher>,
    should_driven: bool,
    must_not: DisjunctionSearcher,
    current: Option<DocId>,
    current_score: ScoreType,
}

impl BooleanSearcher {
    fn advance_required(&mut self, target: DocId) -> Option<DocId> {
        if self.should_driven {
            self.should.as_mut().and_then(|s| advance_to_or_past(s, target))
        } else {
            advance_to_or_past(self.required.as_mut(), target)
        }
    }

    fn find_from(&mut self, mut target: DocId) -> Option<DocId> {
        loop {
            let doc = self.advance_required(target)?;
            if advance_to_or_past(&mut self.must_not, doc) == Some(doc) {
                target = doc + 1;
                continue;
            }
            let mut score = if self.should_driven { 0.0 } else { self.required.score() };
            if let Some(should) = &mut self.should {
                if advance_to_or_past(should, doc) == Some(doc) {
                    score += should.score();
                }
            }
            self.current_score = score;
            return Some(doc);
        }
    }
}

impl Searcher for BooleanSearcher {
    fn next(&mut self) -> Option<DocId> {
        let target = self.current.map(|d| d + 1).unwrap_or(0);
        self.current = self.find_from(target);
        self.current
    }

    fn advance(&mut self, target: DocId) -> Option<DocId> {
        self.current = self.find_from(target);
        self.current
    }

    fn doc(&self) -> Option<DocId> {
        self.current
    }

    fn score(&self) -> ScoreType {
        self.current_score
    }

    fn doc_match_pool_size(&self) -> usize {
        if self.should_driven {
            self.should.as_ref().map(|s| s.doc_match_pool_size()).unwrap_or(0)
        } else {
            self.required.doc_match_pool_size()
        }
    }

    fn close(&mut self) {
        self.required.close();
        if let Some(should) = &mut self.should {
            should.close();
        }
        self.must_not.close();
    }
}
