use crate::detector::{Detector, Platform, Tier, TechniqueResult};
use crate::platform;

pub struct KernelObjectDetector;

impl Detector for KernelObjectDetector {
    fn name(&self) -> &str {
        "Kernel Object Detection"
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Windows]
    }

    fn scan(&self) -> TechniqueResult {
        #[cfg(windows)]
        let paths = crate::platform::windows::vm_kernel_object_paths();
        #[cfg(not(windows))]
        let paths: &[&str] = &[];

        for path in paths {
            if platform::kernel_object_exists(path) {
                return TechniqueResult::hit(
                    self.name(),
                    Tier::High,
                    format!("Virtual device object present: {}", path),
                );
            }
        }
        TechniqueResult::clean(self.name(), "No VM kernel objects found")
    }
}
