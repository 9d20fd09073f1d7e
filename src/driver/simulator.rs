//! In-process stand-in for a device running PerfectPosture
//!
//! Models just enough of the app for the scenarios: three tabs, the
//! start/stop button, the live chart label and the settings checkboxes.
//! Faults can be injected to exercise the failure paths of the runner.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::common::{Error, Result};
use crate::scenario::app::{
    settings_row_xpath, CHECKBOX_CLASS, CHART_VIEW_ID, ROW_LAYOUT_CLASS, START_STOP_BUTTON_ID,
    STOP_BUTTON_NAME,
};
use crate::scenario::builtin::SETTINGS_LABELS;
use crate::scenario::chart::ChartReading;

use super::{DeviceConnector, DeviceSession, ElementRef, Locator, Orientation, SessionCapabilities};

const START_BUTTON_NAME: &str = "Start Posture Detection";
const SCREENS: [&str; 3] = ["INTRO", "DATA", "SETTINGS"];

/// Observable state of the simulated device
#[derive(Debug, Clone)]
pub struct SimulatorState {
    pub screen: &'static str,
    pub service_running: bool,
    pub orientation: Orientation,
    /// Settings rows in display order
    pub checkboxes: Vec<(String, bool)>,
    pub chart_index: u64,
    pub chart_value: f64,
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    /// Every click, rotation and chart read, in order
    pub actions: Vec<String>,
    capabilities: Map<String, Value>,
    faults: Faults,
}

#[derive(Debug, Clone, Default)]
struct Faults {
    stuck_checkboxes: HashSet<String>,
    frozen_chart: bool,
    drifting_value: bool,
    scripted_labels: VecDeque<String>,
    refuse_open: Option<String>,
    refuse_close: bool,
    deny_rotation: bool,
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self {
            screen: "INTRO",
            service_running: false,
            orientation: Orientation::Portrait,
            checkboxes: SETTINGS_LABELS
                .iter()
                .map(|label| (label.to_string(), true))
                .collect(),
            chart_index: 0,
            chart_value: 9.8,
            sessions_opened: 0,
            sessions_closed: 0,
            actions: Vec::new(),
            capabilities: Map::new(),
            faults: Faults::default(),
        }
    }
}

impl SimulatorState {
    /// Fresh app launch: everything but counters, history and faults resets
    fn relaunch(&mut self, capabilities: Map<String, Value>) {
        let defaults = Self::default();
        self.screen = defaults.screen;
        self.service_running = false;
        self.orientation = defaults.orientation;
        self.checkboxes = defaults.checkboxes;
        self.chart_index = 0;
        self.capabilities = capabilities;
        self.sessions_opened += 1;
    }

    pub fn checkbox(&self, label: &str) -> Option<bool> {
        self.checkboxes
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, checked)| *checked)
    }

    fn row_index(&self, xpath: &str) -> Option<usize> {
        self.checkboxes
            .iter()
            .position(|(label, _)| settings_row_xpath(label) == xpath)
    }

    fn next_chart_label(&mut self) -> String {
        if let Some(label) = self.faults.scripted_labels.pop_front() {
            return label;
        }
        if self.service_running && !self.faults.frozen_chart {
            self.chart_index += 1;
        }
        if self.faults.drifting_value {
            self.chart_value += 0.5;
        }
        ChartReading {
            index: self.chart_index,
            value: self.chart_value,
        }
        .to_label()
    }

    /// Whether an element handle still refers to something on screen
    fn is_visible(&self, element: &str) -> bool {
        let on = |screen: &str| self.screen == screen;
        match element {
            e if e.starts_with("tab:") => true,
            "start_stop" => on("INTRO"),
            "stop" => on("INTRO") && self.service_running,
            "chart" => on("DATA"),
            e if e.starts_with("row:") => on("SETTINGS"),
            _ => false,
        }
    }
}

/// Hands out [`SimulatedDevice`] sessions sharing one device state
#[derive(Debug, Clone, Default)]
pub struct SimulatedConnector {
    state: Arc<Mutex<SimulatorState>>,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatorState> {
        lock(&self.state)
    }

    /// Copy of the current device state
    pub fn snapshot(&self) -> SimulatorState {
        self.lock().clone()
    }

    /// Clicking this row no longer toggles its checkbox
    pub fn stick_checkbox(self, label: &str) -> Self {
        self.lock().faults.stuck_checkboxes.insert(label.to_string());
        self
    }

    /// The chart index stops advancing
    pub fn freeze_chart(self) -> Self {
        self.lock().faults.frozen_chart = true;
        self
    }

    /// The sampled value changes on every read, as if the device were moved
    pub fn drift_value(self) -> Self {
        self.lock().faults.drifting_value = true;
        self
    }

    /// Serve these chart labels verbatim before falling back to the model
    pub fn script_labels<I, S>(self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock()
            .faults
            .scripted_labels
            .extend(labels.into_iter().map(Into::into));
        self
    }

    /// Session creation fails, as when the app cannot be installed
    pub fn refuse_open(self, reason: &str) -> Self {
        self.lock().faults.refuse_open = Some(reason.to_string());
        self
    }

    /// Session teardown reports an error
    pub fn refuse_close(self) -> Self {
        self.lock().faults.refuse_close = true;
        self
    }

    /// The device reports itself as not rotatable
    pub fn deny_rotation(self) -> Self {
        self.lock().faults.deny_rotation = true;
        self
    }
}

#[async_trait]
impl DeviceConnector for SimulatedConnector {
    async fn open(&self, capabilities: &SessionCapabilities) -> Result<Box<dyn DeviceSession>> {
        let mut state = self.lock();
        if let Some(reason) = &state.faults.refuse_open {
            return Err(Error::Session(format!("Application failed to launch: {}", reason)));
        }

        let mut granted = capabilities.to_json();
        if state.faults.deny_rotation {
            granted.insert("rotatable".to_string(), Value::Bool(false));
        }
        state.relaunch(granted);
        tracing::debug!("Simulated session {} opened", state.sessions_opened);

        Ok(Box::new(SimulatedDevice {
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

/// One session on the simulated device
#[derive(Debug)]
pub struct SimulatedDevice {
    state: Arc<Mutex<SimulatorState>>,
    closed: bool,
}

fn lock(state: &Mutex<SimulatorState>) -> MutexGuard<'_, SimulatorState> {
    // A panicking test step must not hide the device state from teardown
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatedDevice {
    fn live(&self) -> Result<MutexGuard<'_, SimulatorState>> {
        if self.closed {
            return Err(Error::Session("Simulated session is already closed".to_string()));
        }
        Ok(lock(&self.state))
    }
}

fn stale(element: &ElementRef) -> Error {
    Error::driver(
        "element",
        &format!("stale element reference: {}", element.as_str()),
    )
}

#[async_trait]
impl DeviceSession for SimulatedDevice {
    async fn find_element(&mut self, locator: &Locator) -> Result<ElementRef> {
        let state = self.live()?;
        let found = match locator {
            Locator::Name(name) if SCREENS.contains(&name.as_str()) => Some(format!("tab:{}", name)),
            Locator::Name(name) if name == STOP_BUTTON_NAME => Some("stop".to_string()),
            Locator::Name(name) if name == START_BUTTON_NAME && !state.service_running => {
                Some("start_stop".to_string())
            }
            Locator::Id(id) if id.ends_with(START_STOP_BUTTON_ID) => Some("start_stop".to_string()),
            Locator::Id(id) if id.ends_with(CHART_VIEW_ID) => Some("chart".to_string()),
            Locator::XPath(xpath) => state.row_index(xpath).map(|i| format!("row:{}", i)),
            _ => None,
        };

        match found {
            Some(element) if state.is_visible(&element) => Ok(ElementRef(element)),
            _ => Err(Error::element_not_found(locator)),
        }
    }

    async fn find_child(&mut self, parent: &ElementRef, locator: &Locator) -> Result<ElementRef> {
        let state = self.live()?;
        if !state.is_visible(parent.as_str()) {
            return Err(stale(parent));
        }

        let parent = parent.as_str();
        let child = match locator {
            Locator::ClassName(class)
                if class == ROW_LAYOUT_CLASS
                    && parent.starts_with("row:")
                    && !parent.contains('/') =>
            {
                Some(format!("{}/layout", parent))
            }
            Locator::ClassName(class) if class == CHECKBOX_CLASS && parent.ends_with("/layout") => {
                Some(parent.replace("/layout", "/checkbox"))
            }
            _ => None,
        };

        child
            .map(ElementRef)
            .ok_or_else(|| Error::element_not_found(locator))
    }

    async fn click(&mut self, element: &ElementRef) -> Result<()> {
        let mut state = self.live()?;
        let id = element.as_str();
        if !state.is_visible(id) {
            return Err(stale(element));
        }
        state.actions.push(format!("click {}", id));

        if let Some(screen) = id.strip_prefix("tab:") {
            if let Some(found) = SCREENS.iter().copied().find(|s| *s == screen) {
                state.screen = found;
            }
            return Ok(());
        }

        match id {
            "start_stop" => state.service_running = !state.service_running,
            "stop" => state.service_running = false,
            row if row.starts_with("row:") => {
                let index = row
                    .trim_start_matches("row:")
                    .split('/')
                    .next()
                    .and_then(|i| i.parse::<usize>().ok())
                    .ok_or_else(|| stale(element))?;
                let state = &mut *state;
                let (label, checked) = state
                    .checkboxes
                    .get_mut(index)
                    .ok_or_else(|| stale(element))?;
                if !state.faults.stuck_checkboxes.contains(label.as_str()) {
                    *checked = !*checked;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn attribute(&mut self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let mut state = self.live()?;
        let id = element.as_str();
        if !state.is_visible(id) {
            return Err(stale(element));
        }

        let value = match (id, name) {
            ("chart", "name") => {
                let label = state.next_chart_label();
                state.actions.push(format!("read chart: {}", label));
                Some(label)
            }
            (tab, "name" | "text") if tab.starts_with("tab:") => {
                Some(tab.trim_start_matches("tab:").to_string())
            }
            (checkbox, "checked") if checkbox.ends_with("/checkbox") => {
                let index = checkbox
                    .trim_start_matches("row:")
                    .trim_end_matches("/checkbox")
                    .parse::<usize>()
                    .map_err(|_| stale(element))?;
                let (_, checked) = state.checkboxes.get(index).ok_or_else(|| stale(element))?;
                Some(checked.to_string())
            }
            _ => None,
        };
        Ok(value)
    }

    async fn rotate(&mut self, orientation: Orientation) -> Result<()> {
        let mut state = self.live()?;
        if state.capabilities.get("rotatable") != Some(&Value::Bool(true)) {
            return Err(Error::driver("rotate", "device is not rotatable"));
        }
        state.orientation = orientation;
        state.actions.push(format!("rotate {}", orientation));
        Ok(())
    }

    async fn capabilities(&mut self) -> Result<Map<String, Value>> {
        Ok(self.live()?.capabilities.clone())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut state = lock(&self.state);
        state.sessions_closed += 1;
        state.service_running = false;
        if state.faults.refuse_close {
            return Err(Error::Session("Simulated device refused to close".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;
    use std::path::Path;

    async fn open(connector: &SimulatedConnector) -> Box<dyn DeviceSession> {
        let caps = SessionCapabilities::from_config(&Config::default(), Path::new("/tmp"));
        connector.open(&caps).await.unwrap()
    }

    #[tokio::test]
    async fn test_tabs_switch_screens() {
        let connector = SimulatedConnector::new();
        let mut device = open(&connector).await;

        let data = device.find_element(&Locator::name("DATA")).await.unwrap();
        device.click(&data).await.unwrap();
        assert_eq!(connector.snapshot().screen, "DATA");
    }

    #[tokio::test]
    async fn test_chart_only_on_data_screen() {
        let connector = SimulatedConnector::new();
        let mut device = open(&connector).await;

        let err = device
            .find_element(&Locator::id("com.brucegiese.perfectposture:id/chart"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ElementNotFound { .. }));
    }

    #[tokio::test]
    async fn test_stop_button_requires_running_service() {
        let connector = SimulatedConnector::new();
        let mut device = open(&connector).await;

        assert!(device.find_element(&Locator::name(STOP_BUTTON_NAME)).await.is_err());

        let button = device
            .find_element(&Locator::id("com.brucegiese.perfectposture:id/start_stop_button"))
            .await
            .unwrap();
        device.click(&button).await.unwrap();
        assert!(connector.snapshot().service_running);

        let stop = device.find_element(&Locator::name(STOP_BUTTON_NAME)).await.unwrap();
        device.click(&stop).await.unwrap();
        assert!(!connector.snapshot().service_running);
    }

    #[tokio::test]
    async fn test_close_counts_once() {
        let connector = SimulatedConnector::new();
        let mut device = open(&connector).await;

        device.close().await.unwrap();
        device.close().await.unwrap();
        assert_eq!(connector.snapshot().sessions_closed, 1);
        assert!(device.find_element(&Locator::name("DATA")).await.is_err());
    }

    #[tokio::test]
    async fn test_refuse_open() {
        let connector = SimulatedConnector::new().refuse_open("no device");
        let caps = SessionCapabilities::from_config(&Config::default(), Path::new("/tmp"));
        let err = connector.open(&caps).await.err().unwrap();
        assert!(matches!(err, Error::Session(_)));
    }

    #[tokio::test]
    async fn test_unknown_row_is_stale() {
        let connector = SimulatedConnector::new();
        let mut device = open(&connector).await;
        let settings = device.find_element(&Locator::name("SETTINGS")).await.unwrap();
        device.click(&settings).await.unwrap();

        let row = ElementRef("row:9".to_string());
        let err = device.click(&row).await.unwrap_err();
        assert!(err.to_string().contains("stale element reference"));

        let checkbox = ElementRef("row:9/checkbox".to_string());
        let err = device.attribute(&checkbox, "checked").await.unwrap_err();
        assert!(matches!(err, Error::Driver { .. }));
        assert!(connector.snapshot().checkboxes.iter().all(|(_, checked)| *checked));
    }

    #[tokio::test]
    async fn test_rotation_denied() {
        let connector = SimulatedConnector::new().deny_rotation();
        let mut device = open(&connector).await;
        assert!(device.rotate(Orientation::Landscape).await.is_err());
        assert_eq!(connector.snapshot().orientation, Orientation::Portrait);
    }
}
