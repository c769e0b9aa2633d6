use super::{advance_to_or_past, Searcher};
use crate::common::types::{DocId, ScoreType};

/// AND of N searchers: leap-frogs the one positioned furthest behind
/// forward until all agree on the same doc, or one is exhausted.
///
/// A bitmap fast path (`OptimizeConjunction`) for dense clauses is not
/// implemented; this crate's segments are small enough in practice that the
/// plain leap-frog below (cost bounded by the rarest clause's doc
/// frequency) is left as the only strategy. See DESIGN.md.
pub struct ConjunctionSearcher {
    children: Vec<Box<dyn Searcher>>,
    current: Option<DocId>,
}

impl ConjunctionSearcher {
    pub fn new(children: Vec<Box<dyn Searcher>>) -> ConjunctionSearcher {
        ConjunctionSearcher { children, current: None }
    }

    fn align(&mut self, mut target: DocId) -> Option<DocId> {
        if self.children.is_empty() {
            return None;
        }
        'outer: loop {
            for child in &mut self.children {
                match advance_to_or_past(child.as_mut(), target) {
                    Some(doc) if doc == target => continue,
                    Some(doc) => {
                        target = doc;
                        continue 'outer;
                    }
                    None => return None,
                }
            }
            return Some(target);
        }
    }
}

impl Searcher for ConjunctionSearcher {
    fn next(&mut self) -> Option<DocId> {
        let target = self.current.map(|d| d + 1).unwrap_or(0);
        self.current = self.align(target);
        self.current
    }

    fn advance(&mut self, target: DocId) -> Option<DocId> {
        self.current = self.align(target);
        self.current
    }

    fn doc(&self) -> Option<DocId> {
        self.current
    }

    fn score(&self) -> ScoreType {
        self.children.iter().map(|c| c.score()).sum()
    }

    fn doc_match_pool_size(&self) -> usize {
        self.children.iter().map(|c| c.doc_match_pool_size()).min().unwrap_or(0)
    }

    fn close(&mut self) {
        for child in &mut self.children {
            child.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        docs: Vec<DocId>,
        idx: Option<usize>,
    }
    impl Fixed {
        fn new(docs: Vec<DocId>) -> Fixed {
            Fixed { docs, idx: None }
        }
    }
    impl Searcher for Fixed {
        fn next(&mut self) -> Option<DocId> {
            self.idx = Some(self.idx.map(|i| i + 1).unwrap_or(0));
            self.doc()
        }
        fn advance(&mut self, target: DocId) -> Option<DocId> {
            loop {
                match self.doc() {
                    Some(d) if d >= target => return Some(d),
                    _ => self.next()?,
                };
            }
        }
        fn doc(&self) -> Option<DocId> {
            self.idx.and_then(|i| self.docs.get(i).copied())
        }
    }

    #[test]
    fn test_conjunction_matches_intersection() {
        let a = Box::new(Fixed::new(vec![1, 2, 3, 5])) as Box<dyn Searcher>;
        let b = Box::new(Fixed::new(vec![2, 3, 4, 5])) as Box<dyn Searcher>;
        let mut conj = ConjunctionSearcher::new(vec![a, b]);
        let mut found = Vec::new();
        while let Some(doc) = conj.next() {
            found.push(doc);
        }
        assert_eq!(found, vec![2, 3, 5]);
    }
}
