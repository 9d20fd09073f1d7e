//! Device session abstraction
//!
//! The scenario runner only talks to a device through [`DeviceSession`].
//! [`client`] implements it over the WebDriver HTTP protocol spoken by
//! Appium/Selendroid; [`simulator`] implements it in-process.

pub mod capabilities;
pub mod client;
pub mod protocol;
pub mod simulator;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::common::Result;

pub use capabilities::SessionCapabilities;
pub use client::{WebDriverConnector, WebDriverSession};
pub use simulator::{SimulatedConnector, SimulatedDevice};

/// Element lookup strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Resource identifier, e.g. `com.example:id/chart`
    Id(String),
    /// Accessible name (exact match)
    Name(String),
    /// Widget class, e.g. `android.widget.CheckBox`
    ClassName(String),
    /// XPath over the view hierarchy
    XPath(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        Locator::Name(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Locator::ClassName(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    /// WebDriver `using` strategy name
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::Name(_) => "name",
            Locator::ClassName(_) => "class name",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v) | Locator::Name(v) | Locator::ClassName(v) | Locator::XPath(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Quote `text` as an XPath 1.0 string literal
///
/// XPath has no escape sequences, so text containing both quote kinds is
/// assembled with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }
    let parts: Vec<String> = text.split('\'').map(|part| format!("'{}'", part)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Opaque handle to an element inside one session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Screen orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Value used on the wire
    pub fn as_wire(&self) -> &'static str {
        match self {
            Orientation::Portrait => "PORTRAIT",
            Orientation::Landscape => "LANDSCAPE",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
        }
    }
}

/// A live connection to one running instance of the application
///
/// Methods take `&mut self`: a session is driven by exactly one scenario at
/// a time.
#[async_trait]
pub trait DeviceSession: Send {
    /// Find one element from the root of the view hierarchy
    async fn find_element(&mut self, locator: &Locator) -> Result<ElementRef>;

    /// Find one element below `parent`
    async fn find_child(&mut self, parent: &ElementRef, locator: &Locator) -> Result<ElementRef>;

    async fn click(&mut self, element: &ElementRef) -> Result<()>;

    /// Read an element attribute; `None` when the attribute is absent
    async fn attribute(&mut self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    async fn rotate(&mut self, orientation: Orientation) -> Result<()>;

    /// Capabilities the server actually granted
    async fn capabilities(&mut self) -> Result<Map<String, Value>>;

    /// Release the session and the device resources behind it
    async fn close(&mut self) -> Result<()>;
}

/// Opens device sessions
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn open(&self, capabilities: &SessionCapabilities) -> Result<Box<dyn DeviceSession>>;
}
