pub mod cli;
pub mod config;
pub mod crawler;
pub mod frontier;
pub mod logging;
pub mod metrics;
pub mod network;
pub mod parser;
pub mod poller;
pub mod retry;
pub mod urls;
pub mod workers;

// Re-export main types for library usage
pub use cli::Cli;
pub use config::{Config, RunConfig, Tuning};
pub use crawler::{CrawlError, CrawlSummary, Crawler, StopReason};
pub use frontier::{CrawlQueue, VisitedSet};
pub use metrics::{CrawlMetrics, StatsSnapshot};
pub use network::{FetchError, HttpResponse};
pub use parser::extract_links;
pub use retry::RetryPolicy;
pub use urls::{PageUrl, UrlError};
pub use workers::WorkerPool;
