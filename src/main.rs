use std::process::ExitCode;

use tracing::error;

use webspider::cli::Cli;
use webspider::crawler::Crawler;
use webspider::logging;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init_logging();

    let mut crawler = match Crawler::new(cli.run_config()) {
        Ok(crawler) => crawler,
        Err(err) => {
            error!(error = %err, "startup failed");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = crawler.bootstrap() {
        error!(error = %err, "bootstrap failed");
        return ExitCode::from(1);
    }

    // A failed wait ends the loop, not the report; partial numbers still print.
    let stop = crawler.run();
    let summary = crawler.summary(stop);

    if cli.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                error!(error = %err, "summary serialization failed");
                return ExitCode::from(1);
            }
        }
    } else {
        println!("{summary}");
    }

    ExitCode::SUCCESS
}
