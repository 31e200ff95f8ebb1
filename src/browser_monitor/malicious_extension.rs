use crate::detector::{Detector, Tier, TechniqueResult};

use super::types::{RawViolation, MALICIOUS_EXTENSION_DETECTED};

pub struct MaliciousExtensionDetector<'a> {
    violations: &'a [RawViolation],
}

impl<'a> MaliciousExtensionDetector<'a> {
    pub fn new(violations: &'a [RawViolation]) -> Self {
        Self { violations }
    }
}

impl Detector for MaliciousExtensionDetector<'_> {
    fn name(&self) -> &str {
        "Malicious Extension Detection"
    }

    fn scan(&self) -> TechniqueResult {
        let hits: Vec<&RawViolation> = self
            .violations
            .iter()
            .filter(|v| v.violation_type == MALICIOUS_EXTENSION_DETECTED)
            .collect();
        if hits.is_empty() {
            return TechniqueResult::clean(self.name(), "No malicious extensions detected");
        }

        let names: Vec<String> = hits
            .iter()
            .filter_map(|v| v.details.get("extensionName").and_then(|n| n.as_str()))
            .map(String::from)
            .collect();
        let details = if names.is_empty() {
            format!("{} malicious extension(s) detected", hits.len())
        } else {
            format!("Malicious extension(s) detected: {}", names.join(", "))
        };

        TechniqueResult::hit(self.name(), Tier::Critical, details).with_count(hits.len() as u32)
    }
}
