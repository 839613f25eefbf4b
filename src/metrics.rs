use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

// Atomic counter for lock-free updates from concurrently running workers
#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self { value: AtomicU64::new(0) }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        Self {
            value: AtomicU64::new(self.value.load(Ordering::Relaxed)),
        }
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// Up/down gauge. `dec` must be paired with an earlier `inc`.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Process-wide crawl counters, shared by the readiness loop and every
/// response worker. All fields are lock-free; each observable event is
/// recorded by exactly one thread, so totals are exact.
#[derive(Debug)]
pub struct CrawlMetrics {
    /// Pages whose response was read to completion.
    pub urls_fetched: Counter,
    /// Raw response bytes (headers included) across all fetched pages.
    pub bytes_fetched: Counter,
    /// Fetches abandoned by a worker.
    pub fetch_failures: Counter,
    /// Worker threads started by the dispatcher.
    pub workers_spawned: Counter,
    /// Readiness waits completed by the loop.
    pub polls: Counter,
    /// Connections registered but not yet resolved by a worker.
    pub pending: Gauge,
    started: Instant,
}

impl CrawlMetrics {
    pub fn new() -> Self {
        Self {
            urls_fetched: Counter::new(),
            bytes_fetched: Counter::new(),
            fetch_failures: Counter::new(),
            workers_spawned: Counter::new(),
            polls: Counter::new(),
            pending: Gauge::new(),
            started: Instant::now(),
        }
    }

    /// Point-in-time view of the counters. Read once at shutdown for the
    /// summary; reading while workers run gives a consistent-enough view
    /// for logging, not an atomic snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            urls_fetched: self.urls_fetched.get(),
            bytes_fetched: self.bytes_fetched.get(),
            fetch_failures: self.fetch_failures.get(),
            workers_spawned: self.workers_spawned.get(),
            polls: self.polls.get(),
            pending: self.pending.get(),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

impl Default for CrawlMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub urls_fetched: u64,
    pub bytes_fetched: u64,
    pub fetch_failures: u64,
    pub workers_spawned: u64,
    pub polls: u64,
    pub pending: u64,
    pub elapsed_secs: f64,
}

impl StatsSnapshot {
    pub fn kb_fetched(&self) -> f64 {
        self.bytes_fetched as f64 / 1024.0
    }

    pub fn avg_kb_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.kb_fetched() / self.elapsed_secs
        } else {
            0.0
        }
    }
}
