//! Execution of the per-observation correction branch
//!
//! The corrector produces one batch of components per observation, and the
//! batches are independent once the per-component quantities are known. A
//! mapper decides how those batches are computed; results always come back in
//! observation order.

use alloc::vec::Vec;

use crate::Result;

/// Maps a fallible task over observation indices `0..count`.
///
/// Implementations must return results in index order and must fail the whole
/// call if any task fails.
pub trait ObservationMapper {
    /// Runs `task` for every index and gathers the results.
    fn map_observations<R, F>(&self, count: usize, task: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(usize) -> Result<R> + Send + Sync;
}

/// Runs every task on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialMapper;

impl ObservationMapper for SerialMapper {
    fn map_observations<R, F>(&self, count: usize, task: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(usize) -> Result<R> + Send + Sync,
    {
        (0..count).map(task).collect()
    }
}

#[cfg(feature = "parallel")]
pub use pooled::PooledMapper;

#[cfg(feature = "parallel")]
mod pooled {
    use alloc::vec::Vec;
    use rayon::prelude::*;

    use super::ObservationMapper;
    use crate::{PhdError, Result};

    /// Runs tasks on a fixed-size worker pool.
    ///
    /// Workers only read shared inputs. The call returns once every task has
    /// finished; the first failure fails the frame.
    #[derive(Debug)]
    pub struct PooledMapper {
        pool: rayon::ThreadPool,
        threads: usize,
    }

    impl PooledMapper {
        /// Builds a pool with exactly `threads` workers.
        ///
        /// # Errors
        /// Returns [`PhdError::Configuration`] for a zero thread count or if
        /// the pool cannot be started.
        pub fn new(threads: usize) -> Result<Self> {
            if threads == 0 {
                return Err(PhdError::config("worker pool needs at least one thread"));
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| alloc::format!("phd-correct-{}", i))
                .build()
                .map_err(|e| PhdError::config(alloc::format!("cannot start worker pool: {}", e)))?;

            Ok(Self { pool, threads })
        }

        /// Number of worker threads.
        pub fn threads(&self) -> usize {
            self.threads
        }
    }

    impl ObservationMapper for PooledMapper {
        fn map_observations<R, F>(&self, count: usize, task: F) -> Result<Vec<R>>
        where
            R: Send,
            F: Fn(usize) -> Result<R> + Send + Sync,
        {
            self.pool
                .install(|| (0..count).into_par_iter().map(&task).collect())
        }
    }
}
