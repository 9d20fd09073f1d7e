//! Error types for the acceptance runner
//!
//! Every variant aborts the current test case. The runner still closes the
//! device session before reporting the failure.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the acceptance runner
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    #[error("Session error: {0}")]
    Session(String),

    // === Element Errors ===
    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    // === Verification Errors ===
    #[error("Could not parse chart label '{label}': {reason}")]
    Parse { label: String, reason: String },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    // === WebDriver Protocol Errors ===
    #[error("WebDriver command '{command}' failed: {message}")]
    Driver { command: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scenario file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create an element not found error for a locator
    pub fn element_not_found(locator: impl std::fmt::Display) -> Self {
        Self::ElementNotFound {
            locator: locator.to_string(),
        }
    }

    /// Create a chart label parse error
    pub fn parse(label: &str, reason: &str) -> Self {
        Self::Parse {
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a WebDriver command failed error
    pub fn driver(command: &str, message: &str) -> Self {
        Self::Driver {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Short machine-readable name for the error kind, used in run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Session(_) => "session",
            Error::ElementNotFound { .. } => "element_not_found",
            Error::Parse { .. } => "parse",
            Error::Assertion(_) => "assertion",
            Error::Driver { .. } | Error::Http(_) => "driver",
            Error::Config(_) | Error::ConfigParse(_) | Error::FileRead { .. } | Error::Yaml(_) => {
                "config"
            }
            Error::Io(_) | Error::Json(_) => "internal",
        }
    }
}
