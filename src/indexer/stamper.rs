use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::Opstamp;

/// Generates monotonically increasing `Opstamp`s, shared between the
/// `IndexWriter` (tagging add/delete operations) and `SegmentUpdater`
/// (tagging commits and merges).
#[derive(Clone)]
pub struct Stamper(Arc<AtomicU64>);

impl Stamper {
    pub fn new(first_opstamp: Opstamp) -> Stamper {
        Stamper(Arc::new(AtomicU64::new(first_opstamp)))
    }

    /// Returns the next available opstamp and increments the counter.
    pub fn stamp(&self) -> Opstamp {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    /// Reserves `count` consecutive opstamps, returning the range.
    pub fn stamps(&self, count: u64) -> Range<Opstamp> {
        let start = self.0.fetch_add(count, Ordering::SeqCst);
        start..start + count
    }

    /// Resets the counter back to `opstamp`, used by `rollback`.
    pub fn revert(&self, opstamp: Opstamp) {
        self.0.store(opstamp, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamper_increments() {
        let stamper = Stamper::new(7);
        assert_eq!(stamper.stamp(), 7);
        assert_eq!(stamper.stamp(), 8);
    }

    #[test]
    fn test_stamper_stamps_range() {
        let stamper = Stamper::new(0);
        let range = stamper.stamps(3);
        assert_eq!(range, 0..3);
        assert_eq!(stamper.stamp(), 3);
    }

    #[test]
    fn test_stamper_revert() {
        let stamper = Stamper::new(0);
        stamper.stamp();
        stamper.stamp();
        stamper.revert(1);
        assert_eq!(stamper.stamp(), 1);
    }
}
