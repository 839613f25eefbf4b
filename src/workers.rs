//! Detached response workers with explicit lifetime tracking.
//!
//! Workers are fire-and-forget: nothing joins them on the hot path. The pool
//! only counts them, so shutdown-sensitive callers (tests, embedders) can
//! wait for the count to reach zero.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::retry::RetryPolicy;

#[derive(Default)]
struct PoolInner {
    active: Mutex<usize>,
    idle: Condvar,
}

/// Decrements the active count when dropped, so a panicking worker still
/// leaves the count balanced.
struct ActiveGuard {
    inner: Arc<PoolInner>,
}

impl ActiveGuard {
    fn enter(inner: &Arc<PoolInner>) -> Self {
        *inner.active.lock() += 1;
        Self { inner: Arc::clone(inner) }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut active = self.inner.active.lock();
        *active -= 1;
        if *active == 0 {
            self.inner.idle.notify_all();
        }
    }
}

/// Spawner for detached worker threads.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    stack_size: usize,
}

impl WorkerPool {
    pub fn new(stack_size: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner::default()),
            stack_size,
        }
    }

    /// Spawn a detached thread running `run(job)`.
    ///
    /// `thread::Builder::spawn` consumes its closure even when thread
    /// creation fails, so the job is parked in a shared slot: a failed
    /// attempt leaves it there for the next one. After the retry budget the
    /// job comes back to the caller along with the error.
    pub fn spawn_job<T: Send + 'static>(
        &self,
        name: &str,
        retry: &RetryPolicy,
        job: T,
        run: fn(T),
    ) -> Result<(), (io::Error, T)> {
        let slot = Arc::new(Mutex::new(Some(job)));
        let spawned = retry.run(|| {
            let slot = Arc::clone(&slot);
            let guard = ActiveGuard::enter(&self.inner);
            thread::Builder::new()
                .name(name.to_string())
                .stack_size(self.stack_size)
                .spawn(move || {
                    let _active = guard;
                    if let Some(job) = slot.lock().take() {
                        run(job);
                    }
                })
                .map(drop)
        });
        match spawned {
            Ok(()) => Ok(()),
            Err(err) => {
                // No attempt started a thread, so the slot still holds the job.
                let job = slot
                    .lock()
                    .take()
                    .expect("job slot emptied without a running thread");
                Err((err, job))
            }
        }
    }

    /// Number of workers currently running.
    pub fn active(&self) -> usize {
        *self.inner.active.lock()
    }

    /// Block until every worker has finished, up to `timeout`. Returns false
    /// when workers were still running at the deadline.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut active = self.inner.active.lock();
        while *active > 0 {
            if self.inner.idle.wait_until(&mut active, deadline).timed_out() {
                return *active == 0;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const STACK: usize = 256 * 1024;

    fn one_shot() -> RetryPolicy {
        RetryPolicy::new(1, Duration::ZERO)
    }

    fn bump(counter: Arc<AtomicUsize>) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn blow_up(_: ()) {
        panic!("worker failure");
    }

    fn slow_bump(counter: Arc<AtomicUsize>) {
        thread::sleep(Duration::from_millis(20));
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn never_runs(_: String) {}

    #[test]
    fn test_jobs_run_and_pool_drains() {
        let pool = WorkerPool::new(STACK);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            pool.spawn_job("test-worker", &one_shot(), Arc::clone(&counter), bump)
                .unwrap();
        }

        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(pool.active(), 0);
    }

    #[test]
    fn test_panicking_worker_still_decrements() {
        let pool = WorkerPool::new(STACK);
        pool.spawn_job("test-worker", &one_shot(), (), blow_up).unwrap();

        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert_eq!(pool.active(), 0);
    }

    #[test]
    fn test_wait_idle_times_out_while_worker_runs() {
        let pool = WorkerPool::new(STACK);
        let counter = Arc::new(AtomicUsize::new(0));
        pool.spawn_job("test-worker", &one_shot(), Arc::clone(&counter), slow_bump)
            .unwrap();

        assert!(!pool.wait_idle(Duration::from_millis(1)));
        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_spawn_hands_the_job_back() {
        // A stack size no thread can map, so every attempt fails.
        let pool = WorkerPool::new(1 << 46);
        let retry = RetryPolicy::new(3, Duration::ZERO);

        let result = pool.spawn_job("test-worker", &retry, String::from("payload"), never_runs);

        let (_err, job) = result.unwrap_err();
        assert_eq!(job, "payload");
        assert_eq!(pool.active(), 0);
    }
}
