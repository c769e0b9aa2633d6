use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::doc_match::DocumentMatch;
use super::sort::SortKey;

/// Bound under which a linear vec scan beats maintaining a heap: below this
/// many live slots, the constant-factor savings of `Vec::insert` outweigh
/// `BinaryHeap`'s asymptotics.
const LINEAR_SCAN_THRESHOLD: usize = 10;

/// Keeps the top `size + skip` matches seen so far, in descending score
/// order. Small requests use a sorted `Vec` (simpler, no allocation churn
/// from heap rebalancing); larger ones use a min-heap so inserts that don't
/// beat the current floor are `O(log n)` instead of `O(n)`.
pub enum BoundedStore {
    Linear { capacity: usize, items: Vec<DocumentMatch> },
    Heap { capacity: usize, items: BinaryHeap<Reverse<DocumentMatch>> },
}

impl BoundedStore {
    pub fn new(capacity: usize) -> BoundedStore {
        if capacity <= LINEAR_SCAN_THRESHOLD {
            BoundedStore::Linear { capacity, items: Vec::with_capacity(capacity) }
        } else {
            BoundedStore::Heap { capacity, items: BinaryHeap::with_capacity(capacity) }
        }
    }

    pub fn capacity(&self) -> usize {
        match self {
            BoundedStore::Linear { capacity, .. } => *capacity,
            BoundedStore::Heap { capacity, .. } => *capacity,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BoundedStore::Linear { items, .. } => items.len(),
            BoundedStore::Heap { items, .. } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sort key a new match must beat to be worth inserting, once the
    /// store is at capacity. `None` means everything is still accepted.
    pub fn threshold(&self) -> Option<&SortKey> {
        if self.len() < self.capacity() {
            return None;
        }
        match self {
            BoundedStore::Linear { items, .. } => items.last().map(|m| &m.sort_key),
            BoundedStore::Heap { items, .. } => items.peek().map(|Reverse(m)| &m.sort_key),
        }
    }

    pub fn insert(&mut self, candidate: DocumentMatch) {
        if self.capacity() == 0 {
            return;
        }
        match self {
            BoundedStore::Linear { capacity, items } => {
                let pos = items.partition_point(|m| *m >= candidate);
                items.insert(pos, candidate);
                items.truncate(*capacity);
            }
            BoundedStore::Heap { capacity, items } => {
                if items.len() < *capacity {
                    items.push(Reverse(candidate));
                } else if let Some(Reverse(worst)) = items.peek() {
                    if candidate > *worst {
                        items.pop();
                        items.push(Reverse(candidate));
                    }
                }
            }
        }
    }

    /// Drains into descending-score order.
    pub fn into_sorted_vec(self) -> Vec<DocumentMatch> {
        match self {
            BoundedStore::Linear { items, .. } => items,
            BoundedStore::Heap { items, .. } => items.into_sorted_vec().into_iter().map(|Reverse(m)| m).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_match(doc: u32, score: f32) -> DocumentMatch {
        DocumentMatch::new(0, doc, score, SortKey::from_raw(vec![score as f64, 0.0]))
    }

    #[test]
    fn test_linear_store_keeps_top_n() {
        let mut store = BoundedStore::new(2);
        for (doc, score) in [(1, 1.0), (2, 3.0), (3, 2.0)] {
            store.insert(doc_match(doc, score));
        }
        let results = store.into_sorted_vec();
        assert_eq!(results.iter().map(|m| m.doc).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_heap_store_keeps_top_n() {
        let mut store = BoundedStore::new(20);
        for doc in 0..50u32 {
            store.insert(doc_match(doc, doc as f32));
        }
        let results = store.into_sorted_vec();
        assert_eq!(results.len(), 20);
        assert_eq!(results[0].doc, 49);
        assert_eq!(results.last().unwrap().doc, 30);
    }

    #[test]
    fn test_threshold_is_none_until_full() {
        let mut store = BoundedStore::new(2);
        assert_eq!(store.threshold(), None);
        store.insert(doc_match(1, 5.0));
        assert_eq!(store.threshold(), None);
        store.insert(doc_match(2, 3.0));
        assert_eq!(store.threshold(), Some(&SortKey::from_raw(vec![3.0, 0.0])));
    }
}
