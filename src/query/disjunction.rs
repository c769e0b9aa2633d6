use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::Searcher;
use crate::common::types::{DocId, ScoreType};

/// OR of N searchers: merges them via a min-heap on doc id, summing the
/// score of every child currently positioned on the winning doc.
///
/// An `OptimizeDisjunctionUnadorned` fast path (skip heap maintenance when
/// every clause is a bare, unscored term lookup) is not implemented
/// separately. The heap-merge below is already the same O(log k) per step
/// that fast path would degrade to once scoring is involved, and every
/// clause here always needs a score. See DESIGN.md.
pub struct DisjunctionSearcher {
    children: Vec<Box<dyn Searcher>>,
    heap: BinaryHeap<Reverse<(DocId, usize)>>,
    current: Option<DocId>,
    current_score: ScoreType,
    started: bool,
}

impl DisjunctionSearcher {
    pub fn new(children: Vec<Box<dyn Searcher>>) -> DisjunctionSearcher {
        DisjunctionSearcher { children, heap: BinaryHeap::new(), current: None, current_score: 0.0, started: false }
    }

    fn seed(&mut self) {
        for (idx, child) in self.children.iter_mut().enumerate() {
            if let Some(doc) = child.next() {
                self.heap.push(Reverse((doc, idx)));
            }
        }
        self.started = true;
    }

    fn pop_matching_group(&mut self) -> Option<DocId> {
        let Reverse((doc, idx)) = self.heap.pop()?;
        let mut score = self.children[idx].score();
        if let Some(next_doc) = self.children[idx].next() {
            self.heap.push(Reverse((next_doc, idx)));
        }
        while let Some(&Reverse((next_doc, _))) = self.heap.peek() {
            if next_doc != doc {
                break;
            }
            let Reverse((_, next_idx)) = self.heap.pop().unwrap();
            score += self.children[next_idx].score();
            if let Some(advanced) = self.children[next_idx].next() {
                self.heap.push(Reverse((advanced, next_idx)));
            }
        }
        self.current_score = score;
        Some(doc)
    }
}

impl Searcher for DisjunctionSearcher {
    fn next(&mut self) -> Option<DocId> {
        if !self.started {
            self.seed();
        }
        self.current = self.pop_matching_group();
        self.current
    }

    fn advance(&mut self, target: DocId) -> Option<DocId> {
        loop {
            match self.next() {
                Some(doc) if doc >= target => return Some(doc),
                Some(_) => continue,
                None => return None,
            }
        }
    }

    fn doc(&self) -> Option<DocId> {
        self.current
    }

    fn score(&self) -> ScoreType {
        self.current_score
    }

    fn doc_match_pool_size(&self) -> usize {
        self.children.iter().map(|c| c.doc_match_pool_size()).sum()
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
        fn score(&self) -> ScoreType {
            1.0
        }
    }

    #[test]
    fn test_disjunction_merges_sorted_and_dedupes() {
        let a = Box::new(Fixed::new(vec![1, 3, 5])) as Box<dyn Searcher>;
        let b = Box::new(Fixed::new(vec![2, 3, 4])) as Box<dyn Searcher>;
        let mut disj = DisjunctionSearcher::new(vec![a, b]);
        let mut found = Vec::new();
        while let Some(doc) = disj.next() {
            found.push(doc);
        }
        assert_eq!(found, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_disjunction_sums_scores_of_matching_children() {
        let a = Box::new(Fixed::new(vec![3])) as Box<dyn Searcher>;
        let b = Box::new(Fixed::new(vec![3])) as Box<dyn Searcher>;
        let mut disj = DisjunctionSearcher::new(vec![a, b]);
        assert_eq!(disj.next(), Some(3));
        assert_eq!(disj.score(), 2.0);
    }
}
