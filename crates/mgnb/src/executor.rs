//! Fan-out of per-feature mixture fits.
//!
//! Every (class, feature) fit is independent, so the classifier hands them to
//! an [`Executor`] as a batch of boxed closures and receives the mixtures back
//! in submission order. Executors never share mutable state with the tasks;
//! the fitted model is assembled from the returned values only.

use std::{fmt, num::NonZeroUsize, panic, thread};

use mgnb_mixture::mixture::FeatureMixture;

/// One mixture fit, ready to run on any thread.
pub type FitTask<'a> = Box<dyn FnOnce() -> FeatureMixture + Send + 'a>;

/// Runs a batch of fit tasks and returns their results in submission order.
///
/// Implementations may run tasks in any order and on any thread, but the
/// result vector must line up with the task vector.
pub trait Executor: fmt::Debug + Send + Sync {
    fn run_ordered(&self, tasks: Vec<FitTask<'_>>) -> Vec<FeatureMixture>;
}

/// Runs every task on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sequential;

impl Executor for Sequential {
    fn run_ordered(&self, tasks: Vec<FitTask<'_>>) -> Vec<FeatureMixture> {
        tasks.into_iter().map(|task| task()).collect()
    }
}

/// Spreads tasks round-robin over a fixed number of scoped threads.
#[derive(Debug, Clone, Copy)]
pub struct ThreadPool {
    workers: NonZeroUsize,
}

impl ThreadPool {
    #[must_use]
    pub fn new(workers: NonZeroUsize) -> Self {
        Self { workers }
    }

    /// One worker per available core (one if that cannot be determined).
    #[must_use]
    pub fn available() -> Self {
        Self::new(thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }
}

impl Executor for ThreadPool {
    fn run_ordered(&self, tasks: Vec<FitTask<'_>>) -> Vec<FeatureMixture> {
        let n_tasks = tasks.len();
        let n_workers = self.workers.get().min(n_tasks);
        if n_workers <= 1 {
            return Sequential.run_ordered(tasks);
        }

        let mut buckets = (0..n_workers).map(|_| Vec::new()).collect::<Vec<_>>();
        for (index, task) in tasks.into_iter().enumerate() {
            buckets[index % n_workers].push((index, task));
        }

        let mut results = vec![FeatureMixture::Absent; n_tasks];
        thread::scope(|s| {
            let handles = buckets
                .into_iter()
                .map(|bucket| {
                    s.spawn(move || {
                        bucket
                            .into_iter()
                            .map(|(index, task)| (index, task()))
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>();
            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (index, mixture) in done {
                            results[index] = mixture;
                        }
                    }
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
        });
        results
    }
}

#[cfg(test)]
mod tests {
    use mgnb_mixture::mixture::GaussianMixture;

    use super::*;

    fn tasks(n: usize) -> Vec<FitTask<'static>> {
        (0..n)
            .map(|i| {
                Box::new(move || {
                    if i % 3 == 0 {
                        FeatureMixture::Absent
                    } else {
                        let mean = f64::from(u32::try_from(i).unwrap());
                        FeatureMixture::Present(GaussianMixture::single(mean, 1.0).unwrap())
                    }
                }) as FitTask<'static>
            })
            .collect()
    }

    #[test]
    fn test_sequential_keeps_order() {
        let results = Sequential.run_ordered(tasks(7));
        assert_eq!(results.len(), 7);
        assert!(results[0].is_absent());
        assert_eq!(results[4].as_mixture().unwrap().mean(), 4.0);
    }

    #[test]
    fn test_pool_matches_sequential() {
        for workers in [1, 2, 3, 8, 32] {
            let pool = ThreadPool::new(NonZeroUsize::new(workers).unwrap());
            assert_eq!(pool.run_ordered(tasks(17)), Sequential.run_ordered(tasks(17)));
        }
    }

    #[test]
    fn test_pool_borrows_from_caller() {
        let data = [1.0, 2.0, 3.0];
        let tasks = data
            .iter()
            .map(|&v| {
                Box::new(move || FeatureMixture::from(GaussianMixture::single(v, v).ok()))
                    as FitTask<'_>
            })
            .collect();
        let results = ThreadPool::new(NonZeroUsize::new(2).unwrap()).run_ordered(tasks);
        assert_eq!(results[2].as_mixture().unwrap().variance(), 3.0);
    }

    #[test]
    fn test_empty_batch() {
        assert!(ThreadPool::available().run_ordered(Vec::new()).is_empty());
    }
}
