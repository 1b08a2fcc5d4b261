//! Worker pool for bulk archive operations.
//!
//! Index rebuilds, virtual-store saves and `process_molecules` all fan a
//! list of UIDs out over a rayon pool. While the pool runs, a scoped
//! polling thread samples the completed-item counter every
//! `poll_interval` and reports it to an optional observer.

use crate::config::{resolve_workers, ArchiveConfig};
use marsdb_core::{Error, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Completed and total work items of a running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Items finished so far
    pub done: usize,
    /// Items scheduled
    pub total: usize,
}

impl Progress {
    /// Completed fraction in `[0, 1]`; an empty job counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}

/// Progress callback, called from the polling thread.
pub type Observer<'a> = &'a (dyn Fn(Progress) + Sync);

/// Cooperative cancellation flag shared between a caller and a running job.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; items already started still finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Error::Cancelled)` once cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Fixed-size rayon pool with progress polling.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
    poll_interval: Duration,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl WorkerPool {
    /// Build a pool with `threads` workers (0 = one per core).
    pub fn new(threads: usize, poll_interval: Duration) -> Result<Self> {
        let threads = resolve_workers(threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("marsdb-worker-{}", i))
            .build()
            .map_err(|e| Error::InvalidOperation(format!("Failed to start worker pool: {}", e)))?;
        Ok(WorkerPool {
            pool,
            threads,
            poll_interval,
        })
    }

    /// Pool sized from an [`ArchiveConfig`]
    pub fn from_config(config: &ArchiveConfig) -> Result<Self> {
        Self::new(config.workers, config.progress_interval())
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `task` once per item.
    ///
    /// Stops scheduling new items after the first error or once `cancel`
    /// is set, and returns that error (`Error::Cancelled` for the flag).
    /// The observer receives a final report after the pool drains.
    pub fn run<T, F>(
        &self,
        items: &[T],
        cancel: Option<&CancelFlag>,
        observer: Option<Observer<'_>>,
        task: F,
    ) -> Result<()>
    where
        T: Sync,
        F: Fn(&T) -> Result<()> + Send + Sync,
    {
        let total = items.len();
        let done = AtomicUsize::new(0);
        let finished = AtomicBool::new(false);

        let report = |done: usize| {
            let progress = Progress { done, total };
            debug!(target: "marsdb::archive", done, total, "Worker progress");
            if let Some(observer) = observer {
                observer(progress);
            }
        };

        let result = thread::scope(|scope| {
            let poller = scope.spawn(|| loop {
                thread::park_timeout(self.poll_interval);
                if finished.load(Ordering::Acquire) {
                    break;
                }
                report(done.load(Ordering::Relaxed));
            });

            let result = self.pool.install(|| {
                items.par_iter().try_for_each(|item| {
                    if let Some(flag) = cancel {
                        flag.check()?;
                    }
                    task(item)?;
                    done.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
            });

            finished.store(true, Ordering::Release);
            poller.thread().unpark();
            result
        });

        report(done.load(Ordering::Relaxed));
        result
    }
}
