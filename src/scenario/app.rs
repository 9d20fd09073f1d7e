//! Scenario steps for the PerfectPosture app
//!
//! [`PostureApp`] wraps a device session and knows where things are on
//! screen. None of the steps check their preconditions: calling one from
//! the wrong screen surfaces as an element lookup failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{sleep, Instant};

use crate::common::config::ChartSampling;
use crate::common::{Error, Result};
use crate::driver::{xpath_literal, DeviceSession, ElementRef, Locator, Orientation, SessionCapabilities};

use super::chart::{self, ChartReading};

/// Resource name of the start/stop button on the INTRO screen
pub const START_STOP_BUTTON_ID: &str = "start_stop_button";

/// Resource name of the live chart on the DATA screen
pub const CHART_VIEW_ID: &str = "chart";

/// Accessible name of the start/stop button while the service runs
pub const STOP_BUTTON_NAME: &str = "Stop Posture Detection";

pub const SETTING_TEXT_CLASS: &str = "android.widget.TextView";
pub const ROW_LAYOUT_CLASS: &str = "android.widget.LinearLayout";
pub const CHECKBOX_CLASS: &str = "android.widget.CheckBox";

/// XPath of the preference row holding the text view labelled `label`
pub fn settings_row_xpath(label: &str) -> String {
    format!(
        "//{}[@text={}]/../..",
        SETTING_TEXT_CLASS,
        xpath_literal(label)
    )
}

/// Top-level tabs of the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Screen {
    Intro,
    Data,
    Settings,
}

impl Screen {
    /// Accessible name of the tab
    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::Intro => "INTRO",
            Screen::Data => "DATA",
            Screen::Settings => "SETTINGS",
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The app under test, driven through one session
pub struct PostureApp<'a> {
    session: &'a mut dyn DeviceSession,
    start_stop_id: String,
    chart_id: String,
    sampling: ChartSampling,
}

impl<'a> PostureApp<'a> {
    pub fn new(
        session: &'a mut dyn DeviceSession,
        capabilities: &SessionCapabilities,
        sampling: ChartSampling,
    ) -> Self {
        Self {
            session,
            start_stop_id: capabilities.resource_id(START_STOP_BUTTON_ID),
            chart_id: capabilities.resource_id(CHART_VIEW_ID),
            sampling,
        }
    }

    /// Click the tab named `screen`
    pub async fn go_to_screen(&mut self, screen: Screen) -> Result<()> {
        let tab = self.session.find_element(&Locator::name(screen.as_str())).await?;
        self.session.click(&tab).await?;
        tracing::debug!("Navigated to {}", screen);
        Ok(())
    }

    /// Start posture detection; expects the INTRO screen with the service idle
    pub async fn start_service(&mut self) -> Result<()> {
        let button = self
            .session
            .find_element(&Locator::id(self.start_stop_id.as_str()))
            .await?;
        self.session.click(&button).await?;
        tracing::debug!("Service started");
        Ok(())
    }

    /// Stop posture detection; expects the INTRO screen with the service running
    pub async fn stop_service(&mut self) -> Result<()> {
        let button = self
            .session
            .find_element(&Locator::name(STOP_BUTTON_NAME))
            .await?;
        self.session.click(&button).await?;
        tracing::debug!("Service stopped");
        Ok(())
    }

    /// Bring the settings checkbox labelled `label` into the `checked` state
    ///
    /// Returns whether a click was needed. Calling it again with the same
    /// state is a no-op returning `false`.
    pub async fn set_checkbox(&mut self, label: &str, checked: bool) -> Result<bool> {
        let row = self
            .session
            .find_element(&Locator::xpath(settings_row_xpath(label)))
            .await?;
        let layout = self
            .session
            .find_child(&row, &Locator::class_name(ROW_LAYOUT_CLASS))
            .await?;
        let checkbox = self
            .session
            .find_child(&layout, &Locator::class_name(CHECKBOX_CLASS))
            .await?;

        if self.is_checked(&checkbox).await? == checked {
            tracing::info!("Checkbox '{}' is already in the requested state", label);
            return Ok(false);
        }

        self.session.click(&row).await?;

        let now = self.is_checked(&checkbox).await?;
        if now != checked {
            return Err(Error::Assertion(format!(
                "checkbox '{}' is {} after clicking, expected {}",
                label,
                checked_word(now),
                checked_word(checked)
            )));
        }

        tracing::info!("Checkbox '{}' {}", label, checked_word(checked));
        Ok(true)
    }

    async fn is_checked(&mut self, checkbox: &ElementRef) -> Result<bool> {
        match self.session.attribute(checkbox, "checked").await? {
            Some(value) => Ok(value == "true"),
            None => Err(Error::driver(
                "get attribute",
                "checkbox has no 'checked' attribute",
            )),
        }
    }

    /// Read the live chart twice and check it is updating with a steady value
    ///
    /// Expects the DATA screen with the service running. Returns both
    /// readings.
    pub async fn verify_real_time_chart_data(&mut self) -> Result<(ChartReading, ChartReading)> {
        let first = self.read_chart_label().await?;

        let second = match self.sampling {
            ChartSampling::Fixed(wait) => {
                sleep(wait).await;
                self.read_chart_label().await?
            }
            ChartSampling::Poll { interval, timeout } => {
                self.poll_chart_label(&first, interval, timeout).await?
            }
        };

        let (a, b) = chart::parse_pair(&first, &second)?;
        tracing::debug!("Chart readings: {} then {}", a, b);
        chart::check_progress(&a, &b)?;
        Ok((a, b))
    }

    /// Re-read the chart until its index moves away from `first` or time runs out
    async fn poll_chart_label(
        &mut self,
        first: &str,
        interval: std::time::Duration,
        timeout: std::time::Duration,
    ) -> Result<String> {
        let deadline = Instant::now() + timeout;
        let start = ChartReading::parse(first).ok();

        loop {
            sleep(interval).await;
            let label = self.read_chart_label().await?;
            let moved = match (start, ChartReading::parse(&label)) {
                (Some(a), Ok(b)) => a.index != b.index,
                // Unparseable labels are reported by the verification itself
                _ => true,
            };
            if moved || Instant::now() >= deadline {
                return Ok(label);
            }
        }
    }

    async fn read_chart_label(&mut self) -> Result<String> {
        // Looked up afresh each time: the view may be recreated between reads
        let chart = self
            .session
            .find_element(&Locator::id(self.chart_id.as_str()))
            .await?;
        let label = self.session.attribute(&chart, "name").await?;
        label.ok_or_else(|| Error::parse("", "chart has no 'name' attribute"))
    }

    pub async fn rotate(&mut self, orientation: Orientation) -> Result<()> {
        self.session.rotate(orientation).await?;
        tracing::debug!("Rotated to {}", orientation);
        Ok(())
    }

    /// Assert that the server granted capability `name` with value `expected`
    pub async fn require_capability(&mut self, name: &str, expected: &Value) -> Result<()> {
        let granted = self.session.capabilities().await?;
        match granted.get(name) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(Error::Assertion(format!(
                "capability '{}' is {}, expected {}",
                name, actual, expected
            ))),
            None => Err(Error::Assertion(format!(
                "capability '{}' was not granted, expected {}",
                name, expected
            ))),
        }
    }
}

fn checked_word(checked: bool) -> &'static str {
    if checked {
        "checked"
    } else {
        "unchecked"
    }
}
