use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::browser_monitor::types::RawViolation;

/// Extension -> host messages, tagged by `type`. Unknown discriminators
/// are preserved as `Unknown` so the dispatcher can log and drop them
/// instead of failing to deserialize the whole frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ExtensionMessage {
    #[serde(rename = "EXTENSION_READY")]
    ExtensionReady,
    #[serde(rename = "HEARTBEAT")]
    Heartbeat { timestamp: i64, data: Value },
    #[serde(rename = "VIOLATION")]
    Violation {
        #[serde(rename = "violationType")]
        violation_type: String,
        timestamp: i64,
        #[serde(default)]
        details: std::collections::HashMap<String, Value>,
    },
    #[serde(rename = "SCREEN_SHARE_STOPPED")]
    ScreenShareStopped { data: Value },
    #[serde(rename = "PONG")]
    Pong,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostToExtensionConfig {
    pub interval: u64,
    #[serde(rename = "targetWebsite")]
    pub target_website: String,
    #[serde(rename = "suspiciousDomains")]
    pub suspicious_domains: Vec<String>,
}

pub const SUSPICIOUS_DOMAINS: &[&str] = &[
    "meet.google.com",
    "teams.microsoft.com",
    "zoom.us",
    "discord.com",
    "slack.com",
    "whatsapp.com",
    "telegram.org",
    "messenger.com",
    "chat.google.com",
    "hangouts.google.com",
    "whereby.com",
    "jitsi.org",
    "8x8.vc",
    "webex.com",
];

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum HostToExtensionMessage {
    #[serde(rename = "START_MONITORING")]
    StartMonitoring { config: HostToExtensionConfig },
    #[serde(rename = "STOP_MONITORING")]
    StopMonitoring,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandFile {
    pub command: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Owns the runtime directory and the single-writer discipline over its
/// four state files. Only the native host process constructs this.
pub struct NativeHostState {
    pub runtime_dir: PathBuf,
    pub monitoring_active: bool,
}

impl NativeHostState {
    pub fn new(runtime_dir: PathBuf) -> Self {
        Self {
            runtime_dir,
            monitoring_active: false,
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.runtime_dir.join(file)
    }

    /// Called once at host startup: state files are cleared, matching
    /// "the native host's state files are cleared on host startup."
    pub fn clear(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.runtime_dir)?;
        for file in ["violations.json", "heartbeat.json", "status.json", "command.json"] {
            let _ = fs::remove_file(self.path(file));
        }
        Ok(())
    }

    pub fn append_violation(&self, violation_type: &str, timestamp: i64, details: Value) -> std::io::Result<()> {
        let path = self.path("violations.json");
        let mut violations: Vec<RawViolation> = if path.exists() {
            fs::read_to_string(&path)
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        violations.push(RawViolation {
            violation_type: violation_type.to_string(),
            timestamp,
            detected_at: Some(Utc::now().to_rfc3339()),
            details: details
                .as_object()
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
        });
        fs::write(&path, serde_json::to_string_pretty(&violations)?)
    }

    pub fn write_heartbeat(&self, timestamp: i64, data: &Value) -> std::io::Result<()> {
        let payload = serde_json::json!({ "timestamp": timestamp, "data": data });
        fs::write(self.path("heartbeat.json"), serde_json::to_string_pretty(&payload)?)
    }

    pub fn write_status(&self, status: &str, pid: u32) -> std::io::Result<()> {
        let payload = serde_json::json!({
            "status": status,
            "timestamp": Utc::now().timestamp_millis(),
            "pid": pid,
        });
        fs::write(self.path("status.json"), serde_json::to_string_pretty(&payload)?)
    }

    /// Polls `command.json`, consuming (unlinking) it if present. Updates
    /// `monitoring_active` on recognized commands.
    pub fn poll_command(&mut self) -> Option<CommandFile> {
        let path = self.path("command.json");
        if !path.exists() {
            return None;
        }
        let contents = fs::read_to_string(&path).ok()?;
        let _ = fs::remove_file(&path);
        let command: CommandFile = serde_json::from_str(&contents).ok()?;
        match command.command.as_str() {
            "START_MONITORING" => self.monitoring_active = true,
            "STOP_MONITORING" => self.monitoring_active = false,
            _ => {}
        }
        Some(command)
    }

    /// Writer side used by the coordinator, not the host itself: writes a
    /// command file for the host to pick up at its ~1Hz poll cadence.
    pub fn write_command(runtime_dir: &Path, command: &str) -> std::io::Result<()> {
        fs::create_dir_all(runtime_dir)?;
        let payload = serde_json::json!({ "command": command, "timestamp": Utc::now().timestamp_millis() });
        fs::write(runtime_dir.join("command.json"), serde_json::to_string_pretty(&payload)?)
    }
}
