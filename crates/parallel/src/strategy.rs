//! Parallel processing strategies

use rayon::prelude::*;
use std::ops::Range;
use streamprep_core::{Error, Result};

/// Processing mode for algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Single-threaded processing on the calling thread
    Sequential,
    /// Parallel processing on Rayon's global pool
    Parallel,
    /// Parallel on a dedicated pool of exactly this many threads, created for
    /// the call and torn down when it returns
    ParallelWith(usize),
}

impl Default for ProcessingMode {
    fn default() -> Self {
        ProcessingMode::Parallel
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a fallible function over indices and collect the results in index
    /// order.
    ///
    /// The first error aborts the whole map; no partial results are returned.
    fn try_par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn try_par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            ProcessingMode::Parallel => range.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                let pool = scoped_pool(*threads)?;
                pool.install(|| range.into_par_iter().map(f).collect())
            }
        }
    }
}

fn scoped_pool(threads: usize) -> Result<rayon::ThreadPool> {
    if threads == 0 {
        return Err(Error::InvalidParameter {
            name: "threads",
            value: threads.to_string(),
            reason: "worker pool needs at least one thread".to_string(),
        });
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("streamprep-worker-{}", i))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_index_order() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(3),
        ] {
            let out = mode.try_par_map(0..20, |i| Ok(i * 2)).unwrap();
            assert_eq!(out, (0..20).map(|i| i * 2).collect::<Vec<_>>(), "{:?}", mode);
        }
    }

    #[test]
    fn test_dedicated_pool_size() {
        let sizes = ProcessingMode::ParallelWith(4)
            .try_par_map(0..8, |_| Ok(rayon::current_num_threads()))
            .unwrap();
        assert!(sizes.iter().all(|&n| n == 4));
    }

    #[test]
    fn test_error_aborts_map() {
        let result = ProcessingMode::ParallelWith(2).try_par_map(0..10, |i| {
            if i == 7 {
                Err(Error::Other("chunk 7 failed".to_string()))
            } else {
                Ok(i)
            }
        });
        assert!(matches!(result, Err(Error::Other(_))));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let result = ProcessingMode::ParallelWith(0).try_par_map(0..1, Ok);
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }
}
