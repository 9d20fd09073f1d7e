//! Scenarios shipped with the crate
//!
//! Stored as YAML under `scenarios/` and embedded at build time. The two
//! rotation variants are kept side by side: `rotations` is disabled and
//! never touches the settings, `rotations-settings` runs by default and
//! toggles every checkbox.

use crate::common::{Error, Result};

use super::config::Scenario;

/// Labels of the settings checkboxes, in screen order
pub const SETTINGS_LABELS: [&str; 4] = [
    "Send notification icons to the top of the screen to alert bad posture",
    "Allow short vibrations to indicate bad posture",
    "Turn on/off LED to alert bad posture (not implemented yet)",
    "Get an alert every 15 minutes to do a chin tuck exercise",
];

const SOURCES: [(&str, &str); 3] = [
    ("smoke.yaml", include_str!("../../scenarios/smoke.yaml")),
    ("rotations.yaml", include_str!("../../scenarios/rotations.yaml")),
    (
        "rotations_settings.yaml",
        include_str!("../../scenarios/rotations_settings.yaml"),
    ),
];

/// All built-in scenarios, in run order
pub fn all() -> Result<Vec<Scenario>> {
    SOURCES
        .iter()
        .map(|(file, source)| {
            Scenario::from_yaml(source)
                .map_err(|e| Error::Config(format!("Built-in scenario {}: {}", file, e)))
        })
        .collect()
}

/// Look up a built-in scenario by name
pub fn find(name: &str) -> Result<Scenario> {
    let scenarios = all()?;
    let available: Vec<String> = scenarios.iter().map(|s| s.name.clone()).collect();
    scenarios
        .into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| {
            Error::Config(format!(
                "Unknown scenario '{}'. Available: {}",
                name,
                available.join(", ")
            ))
        })
}
