//! The fetch engine: bootstrap batch, readiness loop, response workers.
//!
//! One thread (the caller of [`Crawler::run`]) owns the multiplexer and the
//! in-flight connection table. Each ready connection is handed to a detached
//! worker thread that reads the response and feeds discovered links back
//! through the shared frontier. Connections are only opened by the startup
//! batch; later discoveries accumulate in the queue.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use mio::net::TcpStream;
use mio::Token;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{RunConfig, Tuning};
use crate::frontier::{CrawlQueue, VisitedSet};
use crate::metrics::{CrawlMetrics, StatsSnapshot};
use crate::network::{self, FetchError};
use crate::parser;
use crate::poller::Poller;
use crate::urls::{self, PageUrl, UrlError};
use crate::workers::WorkerPool;

/// Errors that end a crawl before the readiness loop takes over.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("seed URL rejected: {0}")]
    Seed(#[from] UrlError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("readiness facility setup failed: {0}")]
    PollerSetup(io::Error),

    #[error("failed to register connection: {0}")]
    Register(io::Error),
}

/// Why the readiness loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The fetched-page count reached the configured maximum.
    UrlCapReached,
    /// The idle retry budget ran out with no events and an empty queue.
    IdleBudgetExhausted,
    /// The readiness wait itself failed.
    PollFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::UrlCapReached => "url cap reached",
            StopReason::IdleBudgetExhausted => "idle poll budget exhausted",
            StopReason::PollFailed => "readiness wait failed",
        };
        f.write_str(text)
    }
}

/// One in-flight fetch: the URL being fetched and its registered socket.
struct Connection {
    url: PageUrl,
    stream: TcpStream,
}

/// State shared between the loop and every worker, behind one Arc.
struct SharedState {
    config: RunConfig,
    tuning: Tuning,
    visited: VisitedSet,
    queue: CrawlQueue,
    metrics: CrawlMetrics,
}

/// Everything a response worker needs, boxed into one payload so a failed
/// thread spawn hands the connection back intact.
struct FetchJob {
    conn: Connection,
    shared: Arc<SharedState>,
}

/// The crawl engine with constructor-injected tuning for testability.
pub struct Crawler {
    shared: Arc<SharedState>,
    pool: WorkerPool,
    poller: Poller,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    peer: SocketAddr,
}

impl Crawler {
    pub fn new(config: RunConfig) -> Result<Self, CrawlError> {
        Self::with_tuning(config, Tuning::default())
    }

    /// Build the engine: normalize the seed, resolve its host (once for the
    /// whole run), and admit the seed into the frontier.
    pub fn with_tuning(config: RunConfig, tuning: Tuning) -> Result<Self, CrawlError> {
        let seed = PageUrl::parse(&config.seed_url)?;
        let peer = network::resolve_host(seed.host(), seed.port())?;
        let poller = Poller::new(tuning.poll_batch).map_err(CrawlError::PollerSetup)?;
        let pool = WorkerPool::new(tuning.worker_stack_size);

        let shared = Arc::new(SharedState {
            config,
            tuning,
            visited: VisitedSet::new(),
            queue: CrawlQueue::new(),
            metrics: CrawlMetrics::new(),
        });

        debug!(url = %seed, hash = seed.hash(), peer = %peer, "seed admitted");
        shared.visited.try_admit(seed.hash());
        shared.queue.push(seed);

        Ok(Self {
            shared,
            pool,
            poller,
            connections: HashMap::new(),
            next_token: 0,
            peer,
        })
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.shared.visited
    }

    pub fn queue(&self) -> &CrawlQueue {
        &self.shared.queue
    }

    pub fn metrics(&self) -> &CrawlMetrics {
        &self.shared.metrics
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.pool
    }

    /// Connections registered with the multiplexer and not yet dispatched.
    pub fn in_flight(&self) -> usize {
        self.connections.len()
    }

    /// Admit an extra URL before the run starts. Returns false when its hash
    /// was already admitted.
    pub fn enqueue_seed(&self, url: PageUrl) -> bool {
        if self.shared.visited.try_admit(url.hash()) {
            self.shared.queue.push(url);
            true
        } else {
            false
        }
    }

    /// Open the startup batch of connections: one per configured worker,
    /// bounded by what is queued. Each URL is dequeued, connected (with
    /// retry), sent its request, and registered with the multiplexer.
    ///
    /// Any failure is fatal to the run; a partially bootstrapped crawl has
    /// connections nobody will ever dispatch.
    pub fn bootstrap(&mut self) -> Result<usize, CrawlError> {
        let batch = self.shared.config.workers.min(self.shared.queue.len());
        let mut registered = 0;
        for _ in 0..batch {
            let Some(url) = self.shared.queue.pop_front() else { break };
            debug!(url = %url, "connecting");
            let stream = self
                .shared
                .tuning
                .connect_retry
                .run(|| network::connect(&self.peer, self.shared.tuning.connect_timeout))?;
            let mut stream = network::into_nonblocking(stream)?;
            network::send_request(&mut stream, &url, &self.shared.tuning)?;

            let token = Token(self.next_token);
            self.next_token += 1;
            self.poller
                .register(&mut stream, token)
                .map_err(CrawlError::Register)?;
            self.connections.insert(token, Connection { url, stream });
            self.shared.metrics.pending.inc();
            registered += 1;
        }
        info!(registered, "bootstrap complete");
        Ok(registered)
    }

    /// Drive the readiness loop until the URL cap, the idle budget, or a
    /// failed wait stops it. Workers may still be running when this returns.
    pub fn run(&mut self) -> StopReason {
        let mut idle_polls = 0;
        loop {
            let fetched = self.shared.metrics.urls_fetched.get();
            if fetched >= self.shared.config.max_urls {
                info!(fetched, "url cap reached");
                return StopReason::UrlCapReached;
            }

            let ready = match self.poller.wait(self.shared.tuning.wait_interval) {
                Ok(tokens) => tokens,
                Err(err) => {
                    error!(error = %err, "readiness wait failed");
                    return StopReason::PollFailed;
                }
            };
            self.shared.metrics.polls.inc();

            if ready.is_empty() && self.shared.queue.is_empty() {
                idle_polls += 1;
                if idle_polls >= self.shared.config.idle_retry_budget {
                    info!(idle_polls, "idle budget exhausted, no more work");
                    return StopReason::IdleBudgetExhausted;
                }
                continue;
            }
            idle_polls = 0;

            for token in ready {
                self.dispatch(token);
            }
        }
    }

    /// Hand one ready connection to a freshly spawned response worker.
    fn dispatch(&mut self, token: Token) {
        let Some(mut conn) = self.connections.remove(&token) else {
            debug!(token = token.0, "event for unknown token");
            return;
        };

        // The worker takes ownership of the stream, so its registration has
        // to be dropped first.
        if let Err(err) = self.poller.deregister(&mut conn.stream) {
            warn!(error = %err, url = %conn.url, "deregister failed, re-pointing registration");
            if let Err(err) = self.poller.reregister(&mut conn.stream, token) {
                warn!(error = %err, url = %conn.url, "reregister fallback failed");
            }
        }

        let job = FetchJob {
            conn,
            shared: Arc::clone(&self.shared),
        };
        match self.pool.spawn_job(
            "response-worker",
            &self.shared.tuning.spawn_retry,
            job,
            run_fetch,
        ) {
            Ok(()) => {
                self.shared.metrics.workers_spawned.inc();
            }
            Err((err, job)) => {
                // Dropping the job closes the socket.
                error!(error = %err, url = %job.conn.url, "worker spawn failed, dropping fetch");
                self.shared.metrics.fetch_failures.inc();
                self.shared.metrics.pending.dec();
            }
        }
    }

    /// Assemble the end-of-run report.
    pub fn summary(&self, stop: StopReason) -> CrawlSummary {
        CrawlSummary {
            target: self.shared.config.seed_url.clone(),
            stop,
            stats: self.shared.metrics.snapshot(),
        }
    }
}

/// Response worker: read the response, account for it, extract links, and
/// admit the survivors to the queue. The socket closes when the job drops.
fn run_fetch(job: FetchJob) {
    let FetchJob { conn, shared } = job;
    let Connection { url, mut stream } = conn;

    let response = network::read_response(&mut stream, &shared.tuning);
    shared.metrics.pending.dec();

    match response {
        Ok(response) => {
            shared.metrics.urls_fetched.inc();
            shared.metrics.bytes_fetched.add(response.total_bytes as u64);
            debug!(
                url = %url,
                status = ?response.status,
                bytes = response.total_bytes,
                "fetched"
            );
            enqueue_discovered(&shared, &url, &response.body);
        }
        Err(err) => {
            shared.metrics.fetch_failures.inc();
            warn!(url = %url, error = %err, "fetch abandoned");
        }
    }
}

/// Feed keyword-matching same-host links through admission: resolve against
/// the page, filter, normalize, and enqueue each URL at most once ever.
fn enqueue_discovered(shared: &SharedState, page: &PageUrl, body: &str) {
    let base = page.to_string();
    for href in parser::extract_links(body) {
        let Some(absolute) = urls::convert_to_absolute_url(&href, &base) else {
            continue;
        };
        if !urls::matches_keyword(&absolute, &shared.config.keyword) {
            continue;
        }
        let candidate = match PageUrl::parse(&absolute) {
            Ok(candidate) => candidate,
            Err(err) => {
                debug!(href = %absolute, error = %err, "link skipped");
                continue;
            }
        };
        if candidate.host() != page.host() {
            debug!(href = %absolute, "cross-host link skipped");
            continue;
        }
        if shared.visited.try_admit(candidate.hash()) {
            debug!(url = %candidate, hash = candidate.hash(), "admitted");
            shared.queue.push(candidate);
        }
    }
}

/// End-of-run report printed by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub target: String,
    pub stop: StopReason,
    pub stats: StatsSnapshot,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:^54}", "STATISTICS")?;
        writeln!(f, "{}", "-".repeat(54))?;
        writeln!(f, "fetch target:           {}", self.target)?;
        writeln!(f, "urls fetched:           {}", self.stats.urls_fetched)?;
        writeln!(f, "failed fetches:         {}", self.stats.fetch_failures)?;
        writeln!(f, "bytes fetched:          {:.2}KB", self.stats.kb_fetched())?;
        writeln!(f, "time cost:              {:.2}s", self.stats.elapsed_secs)?;
        writeln!(f, "average download speed: {:.2}KB/s", self.stats.avg_kb_per_sec())?;
        write!(f, "stop reason:            {}", self.stop)
    }
}
