use std::collections::HashMap;

use crate::detector::{Detector, Tier, TechniqueResult};

use super::types::{RawViolation, DOM_MANIPULATION_TYPES};

pub struct DomManipulationDetector<'a> {
    violations: &'a [RawViolation],
}

impl<'a> DomManipulationDetector<'a> {
    pub fn new(violations: &'a [RawViolation]) -> Self {
        Self { violations }
    }
}

impl Detector for DomManipulationDetector<'_> {
    fn name(&self) -> &str {
        "DOM Manipulation Detection"
    }

    fn scan(&self) -> TechniqueResult {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for violation in self.violations {
            if let Some(kind) = DOM_MANIPULATION_TYPES
                .iter()
                .find(|t| **t == violation.violation_type)
            {
                *counts.entry(kind).or_insert(0) += 1;
            }
        }

        let total: u32 = counts.values().sum();
        if total == 0 {
            return TechniqueResult::clean(self.name(), "No DOM manipulation detected");
        }

        let mut breakdown: Vec<String> = counts.iter().map(|(kind, count)| format!("{}: {}", kind, count)).collect();
        breakdown.sort();
        let details = format!("DOM manipulation detected ({} event(s)): {}", total, breakdown.join(", "));

        TechniqueResult::hit(self.name(), Tier::Critical, details).with_count(total)
    }
}
