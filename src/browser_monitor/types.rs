use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single violation event as emitted by the browser extension and
/// relayed by the native-messaging host into `violations.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawViolation {
    #[serde(rename = "type")]
    pub violation_type: String,
    pub timestamp: i64,
    #[serde(default)]
    pub detected_at: Option<String>,
    #[serde(default)]
    pub details: HashMap<String, Value>,
}

impl RawViolation {
    pub fn url(&self) -> Option<&str> {
        self.details.get("url").and_then(Value::as_str)
    }
}

pub const SCREEN_SHARE_DETECTED: &str = "SCREEN_SHARE_DETECTED";
pub const SCREEN_SHARE_STOPPED: &str = "SCREEN_SHARE_STOPPED";
pub const MALICIOUS_EXTENSION_DETECTED: &str = "MALICIOUS_EXTENSION_DETECTED";

pub const DOM_MANIPULATION_TYPES: &[&str] = &[
    "FOREIGN_EXTENSION_SCRIPT",
    "EXTENSION_ELEMENT_INJECTED",
    "SUSPICIOUS_OVERLAY",
    "LARGE_CODE_PASTE",
    "PROGRAMMATIC_INPUT",
];

pub const TAB_SWITCHING_TYPES: &[&str] = &[
    "SUSPICIOUS_TAB_ACTIVATED",
    "SUSPICIOUS_TAB_ALREADY_OPEN",
    "SUSPICIOUS_TAB_NAVIGATION",
];
