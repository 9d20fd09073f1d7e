//! Configuration file handling
//!
//! Every field has a default matching the PerfectPosture test rig, so a
//! missing config file is equivalent to an empty one.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Automation server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Target device settings
    #[serde(default)]
    pub device: DeviceConfig,

    /// Application under test
    #[serde(default)]
    pub app: AppConfig,

    /// Live chart verification settings
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Automation server settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Base URL of the WebDriver endpoint
    #[serde(default = "default_server_url")]
    pub url: String,

    /// Timeout for a single HTTP request (session creation installs the app)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:4723/wd/hub".to_string()
}
fn default_request_timeout() -> u64 {
    120
}

/// Target device settings
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_platform_name")]
    pub platform_name: String,

    #[serde(default = "default_platform_version")]
    pub platform_version: String,

    /// Device serial as reported by `adb devices`
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Automation backend selector sent as the `device` capability
    #[serde(default = "default_automation_backend")]
    pub automation_backend: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            platform_name: default_platform_name(),
            platform_version: default_platform_version(),
            device_name: default_device_name(),
            automation_backend: default_automation_backend(),
        }
    }
}

fn default_platform_name() -> String {
    "Android".to_string()
}
fn default_platform_version() -> String {
    "4.4".to_string()
}
fn default_device_name() -> String {
    "9ecad15a".to_string()
}
fn default_automation_backend() -> String {
    "selendroid".to_string()
}

/// Application under test
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Path to the APK; relative paths resolve against the working directory
    #[serde(default = "default_apk")]
    pub apk: PathBuf,

    #[serde(default = "default_package")]
    pub package: String,

    #[serde(default = "default_activity")]
    pub activity: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            apk: default_apk(),
            package: default_package(),
            activity: default_activity(),
        }
    }
}

fn default_apk() -> PathBuf {
    PathBuf::from("Application").join("PerfectPosture.apk")
}
fn default_package() -> String {
    "com.brucegiese.perfectposture".to_string()
}
fn default_activity() -> String {
    ".PerfectPostureActivity".to_string()
}

impl AppConfig {
    /// Absolute path of the APK
    ///
    /// The file is not required to exist; the automation server reports a
    /// missing binary when the session is created.
    pub fn apk_path(&self, working_dir: &Path) -> PathBuf {
        if self.apk.is_absolute() {
            self.apk.clone()
        } else {
            working_dir.join(&self.apk)
        }
    }
}

/// How the second chart reading is obtained
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChartMode {
    /// Sleep once for `interval_ms`, then read again
    #[default]
    Fixed,
    /// Re-read every `interval_ms` until the index moves or the timeout elapses
    Poll,
}

/// Live chart verification settings
#[derive(Debug, Deserialize, Clone)]
pub struct ChartConfig {
    #[serde(default)]
    pub mode: ChartMode,

    #[serde(default = "default_chart_interval")]
    pub interval_ms: u64,

    /// Only used in poll mode
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            mode: ChartMode::default(),
            interval_ms: default_chart_interval(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

fn default_chart_interval() -> u64 {
    2000
}
fn default_poll_timeout() -> u64 {
    10
}

/// Resolved waiting strategy between the two chart reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSampling {
    Fixed(Duration),
    Poll { interval: Duration, timeout: Duration },
}

impl Default for ChartSampling {
    fn default() -> Self {
        ChartConfig::default().sampling()
    }
}

impl ChartConfig {
    pub fn sampling(&self) -> ChartSampling {
        let interval = Duration::from_millis(self.interval_ms);
        match self.mode {
            ChartMode::Fixed => ChartSampling::Fixed(interval),
            ChartMode::Poll => ChartSampling::Poll {
                interval,
                timeout: Duration::from_secs(self.poll_timeout_secs),
            },
        }
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.server.url.starts_with("http://") && !self.server.url.starts_with("https://") {
            return Err(Error::Config(format!(
                "server.url must be an http(s) URL, got '{}'",
                self.server.url
            )));
        }
        if self.chart.mode == ChartMode::Poll && self.chart.interval_ms == 0 {
            return Err(Error::Config(
                "chart.interval_ms must be positive in poll mode".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_test_rig() {
        let config = Config::default();
        assert_eq!(config.server.url, "http://127.0.0.1:4723/wd/hub");
        assert_eq!(config.device.platform_name, "Android");
        assert_eq!(config.device.device_name, "9ecad15a");
        assert_eq!(config.device.automation_backend, "selendroid");
        assert_eq!(config.app.package, "com.brucegiese.perfectposture");
        assert_eq!(config.app.activity, ".PerfectPostureActivity");
        assert_eq!(
            config.chart.sampling(),
            ChartSampling::Fixed(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.request_timeout_secs, 120);
        assert_eq!(config.app.apk, PathBuf::from("Application/PerfectPosture.apk"));
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse(
            r#"
            [device]
            device_name = "emulator-5554"

            [chart]
            mode = "poll"
            interval_ms = 250
            poll_timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.device.device_name, "emulator-5554");
        assert_eq!(config.device.platform_version, "4.4");
        assert_eq!(
            config.chart.sampling(),
            ChartSampling::Poll {
                interval: Duration::from_millis(250),
                timeout: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = Config::parse("[server]\nurl = \"127.0.0.1:4723\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = Config::parse("[server\nurl=").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_apk_path_resolution() {
        let app = AppConfig::default();
        let cwd = Path::new("/work/tests");
        assert_eq!(
            app.apk_path(cwd),
            PathBuf::from("/work/tests/Application/PerfectPosture.apk")
        );

        let app = AppConfig {
            apk: PathBuf::from("/opt/builds/app.apk"),
            ..AppConfig::default()
        };
        assert_eq!(app.apk_path(cwd), PathBuf::from("/opt/builds/app.apk"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nurl = \"http://10.0.0.2:4723/wd/hub\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.url, "http://10.0.0.2:4723/wd/hub");

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::load_from(&missing),
            Err(Error::FileRead { .. })
        ));
    }
}
