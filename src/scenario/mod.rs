//! Acceptance scenarios for the PerfectPosture app
//!
//! A scenario is an ordered list of UI steps run against one device
//! session. Built-in scenarios live in `scenarios/*.yaml`; extra ones can be
//! loaded from files with the same format.

pub mod app;
pub mod builtin;
pub mod chart;
mod config;
mod runner;

pub use app::{PostureApp, Screen};
pub use chart::ChartReading;
pub use config::*;
pub use runner::{print_summary, run_scenario, run_suite, CheckboxOutcome, RunOptions, TestResult};
