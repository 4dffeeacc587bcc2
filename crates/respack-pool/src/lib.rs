//! Bounded worker pool with deterministic result ordering and
//! cooperative cancellation (spec §5).
//!
//! Wraps the `threadpool` crate rather than re-implementing a queue:
//! the pool itself only adds the two things a packaging build needs on
//! top of it — an index-preserving collection helper, and a shared
//! cancellation flag workers can poll between items. Grounded on
//! `original_source/include/thread_pool.h`'s `Start`/`Stop`/`Enqueue`
//! shape, translated to Rust's ownership model instead of a raw
//! condition-variable queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

/// Shared flag workers should poll between units of work. Cloning is
/// cheap; all clones observe the same underlying flag.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A bounded pool of OS threads. Dropping it blocks until all
/// submitted work has drained, matching `~ThreadPool()` calling
/// `Stop()` in the original.
pub struct WorkerPool {
    inner: threadpool::ThreadPool,
    cancel: CancelToken,
}

impl WorkerPool {
    /// Creates a pool with exactly `workers` threads. `workers == 0` is
    /// treated as 1: a build must always make progress.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            inner: threadpool::ThreadPool::new(workers),
            cancel: CancelToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn worker_count(&self) -> usize {
        self.inner.max_count()
    }

    /// Runs `f` over every item in `items`, one task per item, and
    /// returns results in the *original* item order regardless of
    /// completion order. Each task receives the cancellation token so
    /// it can bail out early once another task has requested
    /// cancellation; a task that observes cancellation should still
    /// return a value (the caller decides how to represent "skipped").
    ///
    /// Grounded on the index-tagged `mpsc::channel` collection pattern
    /// used for deterministic scan ordering in
    /// `other_examples/7af0c59b_dmitmel-crosscode-localization-engine`.
    pub fn run_indexed<I, T, F>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(usize, I, &CancelToken) -> T + Send + Sync + 'static,
    {
        let total = items.len();
        let (tx, rx) = mpsc::channel::<(usize, T)>();
        let f = Arc::new(f);

        for (index, item) in items.into_iter().enumerate() {
            let tx = tx.clone();
            let f = Arc::clone(&f);
            let cancel = self.cancel.clone();
            self.inner.execute(move || {
                let result = f(index, item, &cancel);
                // The receiver outlives every sender clone, so this
                // only fails if the pool itself is being torn down.
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
        for (index, result) in rx {
            slots[index] = Some(result);
        }
        slots
            .into_iter()
            .map(|slot| slot.expect("every submitted index must report a result"))
            .collect()
    }

    /// Blocks until every previously submitted task has completed.
    pub fn join(&self) {
        self.inner.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn run_indexed_preserves_order_despite_variable_duration() {
        let pool = WorkerPool::new(4);
        let items: Vec<u64> = vec![40, 10, 30, 20, 0];
        let results = pool.run_indexed(items.clone(), |index, delay_ms, _cancel| {
            thread::sleep(Duration::from_millis(delay_ms));
            index
        });
        assert_eq!(results, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancellation_is_observed_by_later_tasks() {
        let pool = WorkerPool::new(2);
        let seen_cancel = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..8).collect();
        let cancel_token = pool.cancel_token();
        cancel_token.cancel();
        let seen = Arc::clone(&seen_cancel);
        let results = pool.run_indexed(items, move |index, _item, cancel| {
            if cancel.is_cancelled() {
                seen.fetch_add(1, Ordering::SeqCst);
            }
            index
        });
        assert_eq!(results.len(), 8);
        assert_eq!(seen_cancel.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn worker_count_is_at_least_one() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.worker_count(), 1);
    }
}
