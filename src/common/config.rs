//! Configuration file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Application under test
    #[serde(default)]
    pub target: TargetConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// WebDriver backend settings
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Simulated backend settings
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Browser backend used to run scenarios
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process simulated to-do application
    #[default]
    Sim,
    /// Real browser through a WebDriver server
    Webdriver,
}

/// Application under test
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Base location loaded before every scenario
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Backend used when the CLI does not pick one
    #[serde(default)]
    pub backend: BackendKind,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            backend: BackendKind::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5500/".to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// How long a locate or assertion keeps retrying
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,

    /// Delay between two attempts
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Timeout for a single WebDriver HTTP request
    #[serde(default = "default_request")]
    pub request_secs: u64,
}

impl Timeouts {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout(),
            poll_interval_ms: default_poll_interval(),
            request_secs: default_request(),
        }
    }
}

fn default_poll_timeout() -> u64 {
    4_000
}
fn default_poll_interval() -> u64 {
    50
}
fn default_request() -> u64 {
    30
}

/// WebDriver backend settings
#[derive(Debug, Deserialize, Clone)]
pub struct WebDriverConfig {
    /// WebDriver server (chromedriver, geckodriver, selenium)
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// Browser name sent in the session capabilities
    #[serde(default = "default_browser")]
    pub browser: String,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            browser: default_browser(),
            headless: default_headless(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
fn default_browser() -> String {
    "chrome".to_string()
}
fn default_headless() -> bool {
    true
}

/// Simulated backend settings
#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    /// Delay between a state change and the DOM update becoming visible
    #[serde(default = "default_render_delay")]
    pub render_delay_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            render_delay_ms: default_render_delay(),
        }
    }
}

fn default_render_delay() -> u64 {
    25
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.target.base_url, "http://localhost:5500/");
        assert_eq!(config.target.backend, BackendKind::Sim);
        assert_eq!(config.timeouts.poll_timeout(), Duration::from_secs(4));
        assert_eq!(config.timeouts.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.webdriver.browser, "chrome");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [target]
            backend = "webdriver"

            [timeouts]
            poll_timeout_ms = 1500
            "#,
        )
        .unwrap();
        assert_eq!(config.target.backend, BackendKind::Webdriver);
        assert_eq!(config.target.base_url, "http://localhost:5500/");
        assert_eq!(config.timeouts.poll_timeout_ms, 1500);
        assert_eq!(config.timeouts.poll_interval_ms, 50);
        assert_eq!(config.simulator.render_delay_ms, 25);
    }

    #[test]
    fn test_invalid_file_is_config_parse_error() {
        let err = Config::parse("[timeouts]\npoll_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, crate::common::Error::ConfigParse(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[webdriver]\nheadless = false\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert!(!config.webdriver.headless);
    }
}
