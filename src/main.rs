#![cfg(not(tarpaulin_include))]

use clap::Parser;
use dashboard::app;
use dashboard::config::{self, Config};

/// Main entry point for the dashboard web server
///
/// Reads the configuration from flags and environment, loads and merges the
/// data directory, then serves until shutdown.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init_logging();
    let config = Config::parse();
    app::run(config).await
}
