use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation shared between a query's caller and the
/// collector pipeline driving it. Checked every [`CHECK_DONE_EVERY`]
/// matches rather than on every doc, so it costs nothing noticeable on the
/// hot path.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

/// How many matches a collector processes between cancellation checks.
pub const CHECK_DONE_EVERY: usize = 1024;

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_is_shared_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
