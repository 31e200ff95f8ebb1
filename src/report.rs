use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detector::DetectionResult;
use crate::error::ReportError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub session_id: String,
    pub timestamp: String,
    pub vm_detection: DetectionResult,
    pub remote_access: DetectionResult,
    pub browser_tab: DetectionResult,
    pub final_verdict: crate::detector::Verdict,
}

impl ScanReport {
    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(ReportError::from)
    }

    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| ReportError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}
