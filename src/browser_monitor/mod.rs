//! Browser violation engine: ingests `RawViolation` events emitted by the
//! native-messaging host and fuses four per-technique detectors under an
//! accumulator-style policy.

mod dom_manipulation;
mod malicious_extension;
mod screen_share;
mod tab_switching;
pub mod types;

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::Config;
use crate::detector::{safe_scan, DetectionResult, Detector, Tier, Verdict};

pub use types::RawViolation;

pub struct BrowserMonitorEngine {
    runtime_dir: PathBuf,
    session_id: String,
    allow_suspicious_websites: bool,
    allow_suspicious_extensions: bool,
    last_violation_count: Mutex<Option<usize>>,
}

impl BrowserMonitorEngine {
    pub fn new(config: &Config, runtime_dir: PathBuf, session_id: String) -> Self {
        Self {
            runtime_dir,
            session_id,
            allow_suspicious_websites: config.browser.allow_suspicious_websites,
            allow_suspicious_extensions: config.browser.allow_suspicious_extensions,
            last_violation_count: Mutex::new(None),
        }
    }

    fn violations_path(&self) -> PathBuf {
        self.runtime_dir.join("violations.json")
    }

    fn load_violations(&self) -> Option<Vec<RawViolation>> {
        let path = self.violations_path();
        if !path.exists() {
            return None;
        }
        let contents = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub fn run(&self) -> DetectionResult {
        let violations = self.load_violations().unwrap_or_default();
        *self.last_violation_count.lock().expect("mutex poisoned") = Some(violations.len());
        self.evaluate(&violations)
    }

    /// Monitoring-mode pass: short-circuits to SKIPPED when the violations
    /// file is absent or unchanged since the last call (watermark check).
    pub fn check_current_state(&self) -> DetectionResult {
        let path = self.violations_path();
        if !path.exists() {
            return DetectionResult::skipped("Waiting for browser monitoring to start");
        }

        let violations = match self.load_violations() {
            Some(v) => v,
            None => return DetectionResult::skipped("No new activity"),
        };

        let mut watermark = self.last_violation_count.lock().expect("mutex poisoned");
        if *watermark == Some(violations.len()) {
            return DetectionResult::skipped("No new activity");
        }
        *watermark = Some(violations.len());
        drop(watermark);

        self.evaluate(&violations)
    }

    fn evaluate(&self, violations: &[RawViolation]) -> DetectionResult {
        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(screen_share::ScreenShareDetector::new(violations)),
            Box::new(tab_switching::TabSwitchingDetector::new(violations)),
            Box::new(malicious_extension::MaliciousExtensionDetector::new(violations)),
            Box::new(dom_manipulation::DomManipulationDetector::new(violations)),
        ];

        let items: Vec<_> = detectors
            .iter()
            .map(|detector| {
                tracing::debug!(detector = detector.name(), "running browser detector");
                safe_scan(detector.as_ref())
            })
            .collect();

        let mut result = fuse(items, self.allow_suspicious_websites, self.allow_suspicious_extensions);
        result.session_id = Some(self.session_id.clone());
        result.total_violations = Some(violations.iter().filter(|_| true).count() as u32);
        result.exam_duration_minutes = Some(exam_duration_minutes(violations));
        result
    }
}

fn exam_duration_minutes(violations: &[RawViolation]) -> f64 {
    if violations.is_empty() {
        return 0.0;
    }
    let min_ts = violations.iter().map(|v| v.timestamp).min().unwrap_or(0);
    let max_ts = violations.iter().map(|v| v.timestamp).max().unwrap_or(0);
    (max_ts - min_ts) as f64 / 1000.0 / 60.0
}

fn fuse(
    items: Vec<crate::detector::TechniqueResult>,
    allow_websites: bool,
    allow_extensions: bool,
) -> DetectionResult {
    let (critical, high, medium, low) = DetectionResult::counters_from(&items);

    let detected = |name: &str| {
        items
            .iter()
            .any(|r| r.name == name && r.detected && r.error.is_none())
    };

    let mut block_reasons: Vec<String> = Vec::new();
    let mut flag_count = 0u32;

    if detected("Screen Sharing Detection") {
        block_reasons.push("Screen Sharing Detected (Critical)".to_string());
    }
    if detected("DOM Manipulation Detection") {
        block_reasons.push("DOM manipulation detected by extension".to_string());
    }
    if detected("Malicious Extension Detection") {
        if allow_extensions {
            flag_count += 1;
        } else {
            block_reasons.push("Malicious Extension Detected".to_string());
        }
    }
    if detected("Tab Switching Detection") {
        if allow_websites {
            flag_count += 1;
        } else {
            block_reasons.push("High-Severity Violations (Communication Apps)".to_string());
        }
    }

    let total_violations: u32 = items.iter().map(|i| i.count).sum();
    if medium > 0 && total_violations >= 10 {
        flag_count += 1;
    }

    let (verdict, reason) = if !block_reasons.is_empty() {
        (Verdict::Block, block_reasons.join(", "))
    } else if flag_count > 0 {
        let reason = if flag_count == 1 {
            "Single violation type detected - Manual Review Recommended".to_string()
        } else {
            format!("Multiple violations detected ({} types) – Manual Review Required", flag_count)
        };
        (Verdict::Flag, reason)
    } else if medium > 0 {
        (Verdict::Allow, "Minor Violations Within Acceptable Limits".to_string())
    } else {
        (Verdict::Allow, "Clean exam session".to_string())
    };

    DetectionResult {
        critical,
        high,
        medium,
        low,
        verdict,
        reason,
        items,
        session_id: None,
        total_violations: None,
        exam_duration_minutes: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::TechniqueResult;

    #[test]
    fn screen_share_is_an_unconditional_block() {
        let items = vec![TechniqueResult::hit("Screen Sharing Detection", Tier::Critical, "x").with_count(1)];
        let result = fuse(items, true, true);
        assert_eq!(result.verdict, Verdict::Block);
    }

    #[test]
    fn scenario_s6_permissive_config_downgrades_to_flag() {
        let items = vec![
            TechniqueResult::hit("Tab Switching Detection", Tier::High, "x").with_count(1),
            TechniqueResult::hit("Malicious Extension Detection", Tier::Critical, "x").with_count(1),
        ];
        let result = fuse(items, true, true);
        assert_eq!(result.verdict, Verdict::Flag);
        assert_eq!(
            result.reason,
            "Multiple violations detected (2 types) – Manual Review Required"
        );
    }

    #[test]
    fn strict_config_blocks_tab_switching() {
        let items = vec![TechniqueResult::hit("Tab Switching Detection", Tier::High, "x").with_count(1)];
        let result = fuse(items, false, false);
        assert_eq!(result.verdict, Verdict::Block);
    }

    #[test]
    fn nothing_detected_is_clean() {
        let items = vec![TechniqueResult::clean("Screen Sharing Detection", "clean")];
        let result = fuse(items, false, false);
        assert_eq!(result.verdict, Verdict::Allow);
        assert_eq!(result.reason, "Clean exam session");
    }
}
