//! Scenario definitions
//!
//! Defines the data structures for deserializing YAML scenarios.

use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::driver::Orientation;

use super::app::Screen;

/// A complete scenario: one test case
#[derive(Deserialize, Debug, Clone)]
pub struct Scenario {
    /// Name used to select the scenario on the command line
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Disabled scenarios only run when selected explicitly
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// The sequence of steps to execute
    pub steps: Vec<ScenarioStep>,
}

fn default_enabled() -> bool {
    true
}

/// A single step in the execution flow
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Press the start button on the INTRO screen
    StartService,
    /// Press "Stop Posture Detection" on the INTRO screen
    StopService,
    /// Switch tabs
    GoTo { screen: Screen },
    /// Bring a settings checkbox into a state
    SetCheckbox { label: String, checked: bool },
    /// Check that the live chart is updating
    VerifyChart,
    /// Rotate the device
    Rotate { orientation: Orientation },
    /// Check a capability granted by the server
    RequireCapability {
        name: String,
        value: serde_json::Value,
    },
}

impl std::fmt::Display for ScenarioStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioStep::StartService => write!(f, "start service"),
            ScenarioStep::StopService => write!(f, "stop service"),
            ScenarioStep::GoTo { screen } => write!(f, "go to {}", screen),
            ScenarioStep::SetCheckbox { label, checked } => {
                write!(f, "{} '{}'", if *checked { "check" } else { "uncheck" }, label)
            }
            ScenarioStep::VerifyChart => write!(f, "verify chart"),
            ScenarioStep::Rotate { orientation } => write!(f, "rotate {}", orientation),
            ScenarioStep::RequireCapability { name, value } => {
                write!(f, "require {} = {}", name, value)
            }
        }
    }
}

impl Scenario {
    /// Parse one scenario from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(content)?;
        if scenario.steps.is_empty() {
            return Err(Error::Config(format!(
                "Scenario '{}' has no steps",
                scenario.name
            )));
        }
        Ok(scenario)
    }

    /// Load a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read scenario '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }
}
