//! Remote-access detection engine: process enumeration + TCP correlation
//! + reverse DNS, fused with an RDP session check.

mod constants;
mod process_detector;
mod rdp_session;

use crate::config::Config;
use crate::detector::{safe_monitor, safe_scan, DetectionResult, Detector, TechniqueResult, Verdict};

pub struct RemoteAccessEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl RemoteAccessEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            detectors: vec![
                Box::new(process_detector::ProcessDetector::new(config)),
                Box::new(rdp_session::RdpSessionDetector),
            ],
        }
    }

    pub fn run(&self) -> DetectionResult {
        let items: Vec<_> = self
            .detectors
            .iter()
            .map(|detector| {
                tracing::debug!(detector = detector.name(), "running remote-access detector");
                safe_scan(detector.as_ref())
            })
            .collect();
        fuse(items, self.detectors.is_empty())
    }

    /// Cheaper monitoring-mode pass used by the coordinator's periodic loop.
    pub fn check_current_state(&self) -> DetectionResult {
        let items: Vec<_> = self
            .detectors
            .iter()
            .map(|detector| safe_monitor(detector.as_ref()))
            .collect();
        fuse(items, self.detectors.is_empty())
    }
}

fn fuse(items: Vec<TechniqueResult>, no_detectors: bool) -> DetectionResult {
    if no_detectors {
        return DetectionResult::skipped("No detection modules were active.");
    }

    let (critical, high, medium, low) = DetectionResult::counters_from(&items);

    let (verdict, reason) = if critical >= 1 {
        (Verdict::Block, "Active remote control detected".to_string())
    } else if high >= 1 {
        (Verdict::Block, "Remote access tool running".to_string())
    } else if low >= 1 {
        (Verdict::Flag, "Suspicious background service or artifact".to_string())
    } else {
        (Verdict::Allow, "No remote access tools detected".to_string())
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
    use crate::detector::Tier;

    #[test]
    fn critical_process_blocks() {
        let items = vec![TechniqueResult::hit("Process Detection", Tier::Critical, "teamviewer.exe")];
        let result = fuse(items, false);
        assert_eq!(result.verdict, Verdict::Block);
        assert_eq!(result.reason, "Active remote control detected");
    }

    #[test]
    fn empty_detector_list_is_skipped() {
        let result = fuse(Vec::new(), true);
        assert_eq!(result.verdict, Verdict::Skipped);
    }

    #[test]
    fn scenario_s5_port_match_blocks() {
        let items = vec![TechniqueResult::hit(
            "Process Detection",
            Tier::Critical,
            "Connecting to TeamViewer port 5938",
        )];
        let result = fuse(items, false);
        assert_eq!(result.verdict, Verdict::Block);
    }
}
