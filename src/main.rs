//! posture-tests - acceptance tests for the PerfectPosture Android app
//!
//! Runs UI scenarios against a device through an Appium/Selendroid server.

use std::path::PathBuf;

use clap::Parser;
use posture_acceptance::cli::{self, GlobalOptions};
use posture_acceptance::commands::Commands;
use posture_acceptance::common::logging;

#[derive(Parser)]
#[command(name = "posture-tests", about = "PerfectPosture acceptance tests")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: platform config dir/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write logs to the run log file
    #[arg(long, global = true)]
    log_file: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; the guard flushes the log file on exit
    let log_guard = if cli.log_file {
        logging::init_run(cli.verbose).map(|(guard, path)| {
            tracing::info!("Logging to {}", path.display());
            guard
        })
    } else {
        logging::init_cli(cli.verbose);
        None
    };

    let global = GlobalOptions {
        config: cli.config,
        verbose: cli.verbose,
    };

    if let Err(e) = cli::dispatch(cli.command, &global).await {
        eprintln!("Error: {e}");
        drop(log_guard);
        std::process::exit(1);
    }
}
