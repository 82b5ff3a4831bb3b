//! motif-reducer CLI entry point.

use clap::Parser;

use motif_reducer::cli::{self, Cli};
use motif_reducer::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => cli::handle_error(&err, json),
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => cli::handle_error(&err, json),
    };

    if let Err(err) = cli::execute(cli, &config).await {
        cli::handle_error(&err, json);
    }
}
