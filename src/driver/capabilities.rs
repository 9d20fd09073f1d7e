//! Session capabilities requested when opening a device session

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::common::config::Config;

/// Fixed capability set for one test case
///
/// Built fresh for every scenario and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCapabilities {
    pub platform_name: String,
    pub platform_version: String,
    pub device_name: String,
    pub app: PathBuf,
    pub app_package: String,
    pub app_activity: String,
    pub database_enabled: bool,
    pub rotatable: bool,
    /// Automation backend selector
    pub device: String,
}

impl SessionCapabilities {
    /// Build the capability set from configuration
    ///
    /// `working_dir` anchors a relative APK path.
    pub fn from_config(config: &Config, working_dir: &Path) -> Self {
        Self {
            platform_name: config.device.platform_name.clone(),
            platform_version: config.device.platform_version.clone(),
            device_name: config.device.device_name.clone(),
            app: config.app.apk_path(working_dir),
            app_package: config.app.package.clone(),
            app_activity: config.app.activity.clone(),
            database_enabled: true,
            rotatable: true,
            device: config.device.automation_backend.clone(),
        }
    }

    /// Capabilities as a JSON object, keyed the way the server expects
    pub fn to_json(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct of strings and bools always serializes to an object
            _ => Map::new(),
        }
    }

    /// Resource id of a view inside the application package
    pub fn resource_id(&self, name: &str) -> String {
        format!("{}:id/{}", self.app_package, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_keys() {
        let caps = SessionCapabilities::from_config(&Config::default(), Path::new("/home/ci"));
        let json = caps.to_json();

        assert_eq!(json["platformName"], "Android");
        assert_eq!(json["platformVersion"], "4.4");
        assert_eq!(json["deviceName"], "9ecad15a");
        assert_eq!(json["app"], "/home/ci/Application/PerfectPosture.apk");
        assert_eq!(json["appPackage"], "com.brucegiese.perfectposture");
        assert_eq!(json["appActivity"], ".PerfectPostureActivity");
        assert_eq!(json["databaseEnabled"], true);
        assert_eq!(json["rotatable"], true);
        assert_eq!(json["device"], "selendroid");
        assert_eq!(json.len(), 9);
    }

    #[test]
    fn test_resource_id() {
        let caps = SessionCapabilities::from_config(&Config::default(), Path::new("/"));
        assert_eq!(
            caps.resource_id("chart"),
            "com.brucegiese.perfectposture:id/chart"
        );
    }
}
