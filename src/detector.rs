use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity/tier assigned to a single technique's finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

/// Per-engine verdict. Ordering matches the monotonic promotion rule:
/// BLOCK > FLAG > ALLOW > SKIPPED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Skipped,
    Allow,
    Flag,
    Block,
}

impl Verdict {
    fn rank(self) -> u8 {
        match self {
            Verdict::Skipped => 0,
            Verdict::Allow => 1,
            Verdict::Flag => 2,
            Verdict::Block => 3,
        }
    }
}

impl PartialOrd for Verdict {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Verdict {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// The current process's supported platform identifier, as used by
/// `Detector::supported_platforms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// Result of a single detector's `scan()`/`monitor()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueResult {
    pub name: String,
    pub detected: bool,
    pub tier: Tier,
    pub details: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

impl TechniqueResult {
    pub fn clean(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detected: false,
            tier: Tier::Unknown,
            details: details.into(),
            count: 0,
            error: None,
            data: HashMap::new(),
        }
    }

    pub fn hit(name: impl Into<String>, tier: Tier, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detected: true,
            tier,
            details: details.into(),
            count: 0,
            error: None,
            data: HashMap::new(),
        }
    }

    pub fn skipped(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detected: false,
            tier: Tier::Unknown,
            details: String::new(),
            count: 0,
            error: Some(error.into()),
            data: HashMap::new(),
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// Aggregate result produced by fusing an engine's `TechniqueResult`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub items: Vec<TechniqueResult>,
    pub verdict: Verdict,
    pub reason: String,
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_violations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_duration_minutes: Option<f64>,
}

impl DetectionResult {
    /// Tallies `critical/high/medium/low` from `items`, skipping any result
    /// with `error` set (it never contributes to a counter).
    pub fn counters_from(items: &[TechniqueResult]) -> (u32, u32, u32, u32) {
        let mut critical = 0;
        let mut high = 0;
        let mut medium = 0;
        let mut low = 0;
        for item in items {
            if item.error.is_some() || !item.detected {
                continue;
            }
            match item.tier {
                Tier::Critical => critical += 1,
                Tier::High => high += 1,
                Tier::Medium => medium += 1,
                Tier::Low => low += 1,
                Tier::Unknown => {}
            }
        }
        (critical, high, medium, low)
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            verdict: Verdict::Skipped,
            reason: reason.into(),
            critical: 0,
            high: 0,
            medium: 0,
            low: 0,
            session_id: None,
            total_violations: None,
            exam_duration_minutes: None,
        }
    }
}

/// Common contract every detector implements. `scan()` is the baseline,
/// one-shot check; `monitor()` defaults to `scan()` but detectors whose
/// baseline check is expensive may override it with a cheaper variant.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    /// Empty slice means "supported on all platforms".
    fn supported_platforms(&self) -> &[Platform] {
        &[]
    }

    fn requires_admin(&self) -> bool {
        false
    }

    fn scan(&self) -> TechniqueResult;

    fn monitor(&self) -> TechniqueResult {
        self.scan()
    }
}

/// Enforces platform/privilege gating and converts a detector panic into a
/// `TechniqueResult` with `error` populated, per the framework contract.
pub fn safe_run<F>(detector: &dyn Detector, run: F) -> TechniqueResult
where
    F: FnOnce() -> TechniqueResult + std::panic::UnwindSafe,
{
    let supported = detector.supported_platforms();
    if !supported.is_empty() && !supported.contains(&Platform::current()) {
        return TechniqueResult::skipped(detector.name(), "Platform not supported");
    }
    if detector.requires_admin() && !crate::platform::is_elevated() {
        return TechniqueResult::skipped(detector.name(), "Insufficient permissions");
    }
    match std::panic::catch_unwind(run) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "Detection check failed".to_string());
            tracing::warn!(detector = detector.name(), error = %message, "detector panicked");
            TechniqueResult {
                name: detector.name().to_string(),
                detected: false,
                tier: Tier::Unknown,
                details: "Detection check failed".to_string(),
                count: 0,
                error: Some(message),
                data: HashMap::new(),
            }
        }
    }
}

pub fn safe_scan(detector: &dyn Detector) -> TechniqueResult {
    safe_run(detector, std::panic::AssertUnwindSafe(|| detector.scan()))
}

pub fn safe_monitor(detector: &dyn Detector) -> TechniqueResult {
    safe_run(detector, std::panic::AssertUnwindSafe(|| detector.monitor()))
}
