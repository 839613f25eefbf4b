use clap::Parser;

use crate::config::{Config, RunConfig};

/// CLI entry point so users can control the crawler from the command line.
/// Exit codes: 0=run finished, 1=fatal startup error, 2=usage error or help.
#[derive(Parser, Debug)]
#[command(name = "webspider")]
#[command(about = "Single-host keyword web crawler")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, help = "Seed URL to start fetching from")]
    pub url: String,

    #[arg(
        short = 'n',
        long,
        help = "Stop after this many fetched pages (default: unlimited)"
    )]
    pub max_urls: Option<u64>,

    #[arg(
        short,
        long,
        default_value = "",
        help = "Only follow links whose URL contains this keyword"
    )]
    pub keyword: String,

    #[arg(
        short = 't',
        long,
        default_value_t = Config::DEFAULT_IDLE_RETRY_BUDGET,
        help = "Consecutive idle polls tolerated before giving up"
    )]
    pub idle_timeout: u32,

    #[arg(
        short,
        long,
        default_value_t = Config::DEFAULT_WORKERS,
        help = "Connections opened by the startup batch"
    )]
    pub workers: usize,

    #[arg(long, help = "Print the final summary as JSON")]
    pub json: bool,
}

impl Cli {
    /// Parse CLI arguments so the rest of the program can rely on structured
    /// options. Usage errors and help/version requests both exit with code 2.
    pub fn parse_args() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(err) => {
                let _ = err.print();
                std::process::exit(2);
            }
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            seed_url: self.url.clone(),
            max_urls: self.max_urls.unwrap_or(u64::MAX),
            keyword: self.keyword.clone(),
            idle_retry_budget: self.idle_timeout,
            workers: self.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation_uses_defaults() {
        let cli = Cli::try_parse_from(["webspider", "--url", "http://test.local/"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(cli.url, "http://test.local/");
        assert_eq!(cli.max_urls, None);
        assert_eq!(cli.keyword, "");
        assert_eq!(cli.idle_timeout, Config::DEFAULT_IDLE_RETRY_BUDGET);
        assert_eq!(cli.workers, Config::DEFAULT_WORKERS);
        assert!(!cli.json);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "webspider", "-u", "http://test.local/", "-n", "30", "-k", "foo", "-t", "10", "-w",
            "8",
        ]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(cli.max_urls, Some(30));
        assert_eq!(cli.keyword, "foo");
        assert_eq!(cli.idle_timeout, 10);
        assert_eq!(cli.workers, 8);
    }

    #[test]
    fn test_run_config_mapping() {
        let cli = Cli::try_parse_from(["webspider", "-u", "http://test.local/", "-k", "news"])
            .unwrap();
        let config = cli.run_config();
        assert_eq!(config.seed_url, "http://test.local/");
        assert_eq!(config.max_urls, u64::MAX); // no -n means unlimited
        assert_eq!(config.keyword, "news");
        assert_eq!(config.idle_retry_budget, Config::DEFAULT_IDLE_RETRY_BUDGET);
        assert_eq!(config.workers, Config::DEFAULT_WORKERS);
    }

    #[test]
    fn test_missing_required_url() {
        let cli = Cli::try_parse_from(["webspider"]);
        assert!(cli.is_err());
        let err = cli.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_non_numeric_max_urls_is_a_usage_error() {
        let cli = Cli::try_parse_from(["webspider", "-u", "http://test.local/", "-n", "lots"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_help_does_not_panic() {
        let cli = Cli::try_parse_from(["webspider", "--help"]);
        assert!(cli.is_err());
        let err = cli.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_does_not_panic() {
        let cli = Cli::try_parse_from(["webspider", "--version"]);
        assert!(cli.is_err());
        let err = cli.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
