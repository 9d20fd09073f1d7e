//! CLI command definitions
//!
//! Defines the clap commands for the acceptance runner.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios against the device
    ///
    /// Without arguments, every enabled built-in scenario runs.
    Run {
        /// Built-in scenarios to run, by name (disabled ones included)
        scenarios: Vec<String>,

        /// Also run the scenario defined in this YAML file (repeatable)
        #[arg(long = "file", short = 'f')]
        files: Vec<PathBuf>,

        /// Include built-in scenarios marked as disabled
        #[arg(long)]
        include_disabled: bool,

        /// Run against the in-process simulated device instead of a server
        #[arg(long)]
        simulate: bool,
    },

    /// List built-in scenarios
    List,

    /// Print the session capabilities that would be requested
    Capabilities,

    /// Check that the automation server is reachable
    Status,
}
