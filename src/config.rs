use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub console_output: bool,
    #[serde(default = "default_console_level")]
    pub console_level: String,
    #[serde(default = "default_true")]
    pub file_output: bool,
    #[serde(default = "default_log_path")]
    pub file_path: String,
    #[serde(default = "default_file_level")]
    pub file_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_output: false,
            console_level: default_console_level(),
            file_output: true,
            file_path: default_log_path(),
            file_level: default_file_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub save_json: bool,
    #[serde(default = "default_json_path")]
    pub json_path: String,
    #[serde(default = "default_heartbeat_path")]
    pub heartbeat_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_json: true,
            json_path: default_json_path(),
            heartbeat_path: default_heartbeat_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_interval")]
    pub monitoring_interval: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            monitoring_interval: default_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAccessConfig {
    #[serde(default = "default_true")]
    pub allow_conference_tools: bool,
}

impl Default for RemoteAccessConfig {
    fn default() -> Self {
        Self {
            allow_conference_tools: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub allow_suspicious_websites: bool,
    #[serde(default)]
    pub allow_suspicious_extensions: bool,
    #[serde(default = "default_target_website")]
    pub target_website: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            allow_suspicious_websites: false,
            allow_suspicious_extensions: false,
            target_website: default_target_website(),
        }
    }
}

/// Immutable configuration snapshot. Loaded once at startup and cloned
/// into each engine/coordinator constructor; nothing in this crate reaches
/// back into a shared mutable singleton.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub remote_access: RemoteAccessConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Config {
    /// Loads configuration from `path`, writing this struct's defaults to
    /// disk first if the file does not yet exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let defaults = Config::default();
            defaults.write(path)?;
            return Ok(defaults);
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let json = serde_json::to_string_pretty(self).expect("Config always serializes");
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

pub fn default_config_path() -> PathBuf {
    home_dir().join(".integritywatch").join("config").join("settings.json")
}

pub fn runtime_dir() -> PathBuf {
    home_dir().join(".integritywatch").join("runtime").join("browser")
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_console_level() -> String {
    "INFO".to_string()
}

fn default_file_level() -> String {
    "DEBUG".to_string()
}

fn default_log_path() -> String {
    "logs/integrity_watch.log".to_string()
}

fn default_json_path() -> String {
    "results/scan_report.json".to_string()
}

fn default_heartbeat_path() -> String {
    "results/heartbeat/".to_string()
}

fn default_interval() -> u64 {
    5
}

fn default_target_website() -> String {
    "leetcode.com".to_string()
}

fn default_true() -> bool {
    true
}
