//! Threading runtime for load workers
//!
//! Uses native OS threads (std::thread). Workers share a
//! [`LoadGenerator`](crate::workload::LoadGenerator) through an `Arc` and
//! return whatever per-thread results the caller collects.

use crate::{Error, Result};
use std::sync::{Arc, Barrier};
use std::thread;

/// Multi-threaded runtime for spawning and managing workers
pub struct ThreadingRuntime {
    num_threads: usize,
}

impl ThreadingRuntime {
    pub fn new(num_threads: usize) -> Self {
        Self { num_threads }
    }

    /// Run `num_threads` workers in parallel and collect their results
    ///
    /// All workers are released together by a barrier once every thread has
    /// been spawned. Results are returned in thread id order.
    pub fn run_workers<T, F>(&self, worker_factory: F) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(usize) -> Result<T> + Send + Sync + Clone + 'static,
    {
        let barrier = Arc::new(Barrier::new(self.num_threads));
        let mut handles = Vec::with_capacity(self.num_threads);

        for thread_id in 0..self.num_threads {
            let worker_factory = worker_factory.clone();
            let barrier = barrier.clone();

            let handle = thread::Builder::new()
                .name(format!("keyload-worker-{thread_id}"))
                .spawn(move || {
                    barrier.wait();
                    worker_factory(thread_id)
                })?;
            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle
                .join()
                .map_err(|e| Error::Other(format!("Thread panicked: {:?}", e)))??;
            results.push(result);
        }

        Ok(results)
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }
}
