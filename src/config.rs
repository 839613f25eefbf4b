// Global configuration constants - single source of truth

use std::time::Duration;

use crate::retry::RetryPolicy;

pub struct Config;

impl Config {
    // Readiness loop
    pub const POLL_BATCH: usize = 30;
    pub const WAIT_INTERVAL_MS: u64 = 2000;
    pub const DEFAULT_IDLE_RETRY_BUDGET: u32 = 20;
    pub const DEFAULT_WORKERS: usize = 5;

    // Connecting
    pub const CONNECT_ATTEMPTS: u32 = 5;
    pub const CONNECT_RETRY_DELAY_MS: u64 = 1000;
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    // Request/response I/O on non-blocking sockets
    pub const SEND_ATTEMPTS: u32 = 40;
    pub const SEND_RETRY_DELAY_MS: u64 = 25;
    pub const READ_ATTEMPTS: u32 = 200;
    pub const READ_RETRY_DELAY_MS: u64 = 25;
    pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024; // 10MB

    // Worker threads
    pub const SPAWN_ATTEMPTS: u32 = 3;
    pub const SPAWN_RETRY_DELAY_MS: u64 = 100;
    pub const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024; // 8MB

    pub const USER_AGENT: &'static str = concat!("webspider/", env!("CARGO_PKG_VERSION"));
}

/// Per-run parameters assembled from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub seed_url: String,
    /// Stop once this many pages have been fetched. `u64::MAX` means no cap.
    pub max_urls: u64,
    /// Substring a discovered URL must contain to be followed. Empty matches all.
    pub keyword: String,
    /// Consecutive empty polls (with an empty queue) tolerated before stopping.
    pub idle_retry_budget: u32,
    /// Connections opened by the startup batch.
    pub workers: usize,
}

/// Timing and sizing knobs, injectable so tests can shrink every interval.
/// Production paths use `Tuning::default()`, which mirrors `Config`.
#[derive(Debug, Clone)]
pub struct Tuning {
    pub poll_batch: usize,
    pub wait_interval: Duration,
    pub connect_retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub send_attempts: u32,
    pub send_retry_delay: Duration,
    pub read_attempts: u32,
    pub read_retry_delay: Duration,
    pub spawn_retry: RetryPolicy,
    pub worker_stack_size: usize,
    pub max_response_bytes: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            poll_batch: Config::POLL_BATCH,
            wait_interval: Duration::from_millis(Config::WAIT_INTERVAL_MS),
            connect_retry: RetryPolicy::new(
                Config::CONNECT_ATTEMPTS,
                Duration::from_millis(Config::CONNECT_RETRY_DELAY_MS),
            ),
            connect_timeout: Duration::from_secs(Config::CONNECT_TIMEOUT_SECS),
            send_attempts: Config::SEND_ATTEMPTS,
            send_retry_delay: Duration::from_millis(Config::SEND_RETRY_DELAY_MS),
            read_attempts: Config::READ_ATTEMPTS,
            read_retry_delay: Duration::from_millis(Config::READ_RETRY_DELAY_MS),
            spawn_retry: RetryPolicy::new(
                Config::SPAWN_ATTEMPTS,
                Duration::from_millis(Config::SPAWN_RETRY_DELAY_MS),
            ),
            worker_stack_size: Config::WORKER_STACK_SIZE,
            max_response_bytes: Config::MAX_RESPONSE_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_mirrors_config() {
        let tuning = Tuning::default();
        assert_eq!(tuning.poll_batch, Config::POLL_BATCH);
        assert_eq!(tuning.wait_interval.as_millis() as u64, Config::WAIT_INTERVAL_MS);
        assert_eq!(tuning.connect_retry.attempts(), Config::CONNECT_ATTEMPTS);
        assert_eq!(tuning.max_response_bytes, Config::MAX_RESPONSE_BYTES);
    }

    #[test]
    fn test_user_agent_carries_crate_version() {
        assert!(Config::USER_AGENT.starts_with("webspider/"));
    }
}
