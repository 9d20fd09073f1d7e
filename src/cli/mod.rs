//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::driver::{DeviceConnector, SessionCapabilities, SimulatedConnector, WebDriverConnector};
use crate::scenario::{self, builtin, RunOptions, Scenario};

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

impl GlobalOptions {
    fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, global: &GlobalOptions) -> Result<()> {
    let config = global.load_config()?;

    match command {
        Commands::Run {
            scenarios,
            files,
            include_disabled,
            simulate,
        } => {
            let selected = select_scenarios(&scenarios, &files, include_disabled)?;
            if selected.is_empty() {
                println!("No scenarios selected");
                return Ok(());
            }

            let working_dir = std::env::current_dir()?;
            let mut options = RunOptions::from_config(&config, global.verbose);

            let connector: Box<dyn DeviceConnector> = if simulate {
                println!("{}", "Using simulated device".yellow());
                // The simulator updates instantly; keep the wait short
                options.sampling = crate::common::config::ChartSampling::Fixed(
                    std::time::Duration::from_millis(10),
                );
                Box::new(SimulatedConnector::new())
            } else {
                Box::new(WebDriverConnector::new(&config.server)?)
            };

            let results = scenario::run_suite(
                connector.as_ref(),
                &config,
                &working_dir,
                &selected,
                &options,
            )
            .await;

            if scenario::print_summary(&results) {
                Ok(())
            } else {
                let failed = results.iter().filter(|r| !r.passed).count();
                Err(Error::Assertion(format!(
                    "{} of {} scenarios failed",
                    failed,
                    results.len()
                )))
            }
        }

        Commands::List => {
            let scenarios = builtin::all()?;
            println!("Built-in scenarios:");
            for s in &scenarios {
                let state = if s.enabled { "" } else { " [disabled]" };
                println!(
                    "  {:20} {} steps{}",
                    s.name,
                    s.steps.len(),
                    state.yellow()
                );
                if let Some(desc) = &s.description {
                    println!("  {:20} {}", "", desc.dimmed());
                }
            }
            Ok(())
        }

        Commands::Capabilities => {
            let working_dir = std::env::current_dir()?;
            let caps = SessionCapabilities::from_config(&config, &working_dir);
            println!("Endpoint: {}", config.server.url);
            println!("{}", serde_json::to_string_pretty(&caps.to_json())?);
            Ok(())
        }

        Commands::Status => {
            let connector = WebDriverConnector::new(&config.server)?;
            let status = connector.server_status().await?;
            println!("{} Automation server at {}", "✓".green(), connector.base_url());
            if global.verbose {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else if let Some(version) = status.pointer("/build/version").and_then(|v| v.as_str()) {
                println!("  Version: {}", version);
            }
            Ok(())
        }
    }
}

/// Resolve the scenarios selected on the command line
fn select_scenarios(names: &[String], files: &[PathBuf], include_disabled: bool) -> Result<Vec<Scenario>> {
    let mut selected = Vec::new();

    if names.is_empty() && files.is_empty() {
        selected.extend(
            builtin::all()?
                .into_iter()
                .filter(|s| s.enabled || include_disabled),
        );
    } else {
        for name in names {
            selected.push(builtin::find(name)?);
        }
        for file in files {
            selected.push(load_file(file)?);
        }
    }

    Ok(selected)
}

fn load_file(path: &Path) -> Result<Scenario> {
    Scenario::load(path).map_err(|e| match e {
        Error::Yaml(e) => Error::Config(format!(
            "Failed to parse scenario '{}': {}",
            path.display(),
            e
        )),
        other => other,
    })
}
