use crate::detector::{Detector, Platform, Tier, TechniqueResult};
use crate::platform;

pub struct VirtualRegistryDetector;

impl Detector for VirtualRegistryDetector {
    fn name(&self) -> &str {
        "Virtual Registry Detection"
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Windows]
    }

    fn scan(&self) -> TechniqueResult {
        match platform::registry_canonical_path("") {
            Some(canonical) if canonical.contains("Sandbox_") => TechniqueResult::hit(
                self.name(),
                Tier::Critical,
                format!("\\REGISTRY\\USER canonicalizes to a sandboxed path: {}", canonical),
            ),
            Some(_) | None => TechniqueResult::clean(self.name(), "\\REGISTRY\\USER canonicalizes normally"),
        }
    }
}
