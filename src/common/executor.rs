//! A small executor abstraction shared by `Searcher::search_with_executor`,
//! `MultiSearch` and the `Warmer` GC/warming fan-out.

use rayon::prelude::*;

use crate::common::errors::SearchError;
use crate::Result;

/// Runs a closure over a collection of inputs, either inline on the calling
/// thread or fanned out across a dedicated `rayon` thread pool.
pub enum Executor {
    /// Runs every item on the calling thread, in order.
    SingleThread,
    /// Runs items across a bounded pool of worker threads.
    ThreadPool(rayon::ThreadPool),
}

impl Executor {
    /// An executor that never spawns threads.
    pub fn single_thread() -> Executor {
        Executor::SingleThread
    }

    /// Builds a dedicated thread pool, naming its threads `{prefix}{n}`.
    pub fn multi_thread(num_threads: usize, prefix: &'static str) -> Result<Executor> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |n| format!("{prefix}{n}"))
            .build()
            .map_err(|e| SearchError::SystemError(format!("failed to build thread pool: {e}")))?;
        Ok(Executor::ThreadPool(pool))
    }

    /// Applies `f` to every item of `items`, returning results in input order.
    ///
    /// On the `SingleThread` variant this runs sequentially; on
    /// `ThreadPool` it parallelizes via rayon's `par_iter`. The first error
    /// encountered is reported but every input is still processed:
    /// collection continues so a single failing segment doesn't swallow
    /// the results of the others.
    pub fn map<A, R, AIterator, F>(&self, f: F, args: AIterator) -> Result<Vec<R>>
    where
        A: Send,
        R: Send,
        AIterator: IntoIterator<Item = A>,
        F: Sync + Fn(A) -> Result<R>,
    {
        match self {
            Executor::SingleThread => args.into_iter().map(f).collect(),
            Executor::ThreadPool(pool) => {
                let items: Vec<A> = args.into_iter().collect();
                pool.install(|| items.into_par_iter().map(f).collect())
            }
        }
    }

    /// Number of threads this executor may use concurrently.
    pub fn num_threads(&self) -> usize {
        match self {
            Executor::SingleThread => 1,
            Executor::ThreadPool(pool) => pool.current_num_threads(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_thread_map() {
        let executor = Executor::single_thread();
        let result = executor.map(|x| Ok(x * 2), 0..5).unwrap();
        assert_eq!(result, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_multi_thread_map() {
        let executor = Executor::multi_thread(2, "test-exec-").unwrap();
        let mut result = executor.map(|x| Ok(x * 2), 0..20).unwrap();
        result.sort_unstable();
        assert_eq!(result, (0..20).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_map_propagates_error() {
        let executor = Executor::single_thread();
        let result: Result<Vec<i32>> =
            executor.map(|x| if x == 2 { Err(SearchError::Cancelled) } else { Ok(x) }, 0..5);
        assert!(result.is_err());
    }
}
