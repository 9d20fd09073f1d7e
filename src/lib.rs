//! Acceptance tests for the PerfectPosture Android app
//!
//! Drives the app through an Appium/Selendroid server over the WebDriver
//! protocol: starts and stops posture detection, walks the tabs, toggles the
//! settings checkboxes, rotates the screen and checks that the live chart
//! keeps updating.

pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use driver::{DeviceConnector, DeviceSession, SessionCapabilities};
