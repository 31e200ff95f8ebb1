//! VM/Sandbox detection engine: CPU, firmware, PCI, kernel-object,
//! registry-virtualization and MAC-OUI signals fused into a single verdict.

mod cpu;
mod firmware;
mod kernel_objects;
mod mac_address;
mod pci;
mod virtual_registry;

use crate::detector::{safe_scan, DetectionResult, Detector, Tier, Verdict};

pub struct VmDetectionEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl VmDetectionEngine {
    pub fn new() -> Self {
        Self {
            detectors: vec![
                Box::new(cpu::HypervisorBitDetector),
                Box::new(cpu::VendorStringDetector),
                Box::new(virtual_registry::VirtualRegistryDetector),
                Box::new(firmware::FirmwareTableDetector),
                Box::new(pci::PciDeviceDetector),
                Box::new(kernel_objects::KernelObjectDetector),
                Box::new(mac_address::MacAddressDetector),
            ],
        }
    }

    pub fn run(&self) -> DetectionResult {
        let items: Vec<_> = self
            .detectors
            .iter()
            .map(|detector| {
                tracing::debug!(detector = detector.name(), "running VM detector");
                safe_scan(detector.as_ref())
            })
            .collect();
        fuse(items)
    }
}

impl Default for VmDetectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn fuse(items: Vec<crate::detector::TechniqueResult>) -> DetectionResult {
    let (critical, high, _medium, low) = DetectionResult::counters_from(&items);

    let virtual_registry_hit = items
        .iter()
        .any(|r| r.name == "Virtual Registry Detection" && r.detected && r.error.is_none());

    let (verdict, reason) = if critical >= 1 {
        let reason = if virtual_registry_hit {
            "Sandbox isolation detected".to_string()
        } else if high >= 1 && low >= 1 {
            "Standard VM (No Evasion)".to_string()
        } else if high >= 1 {
            "VM (Lazy Evasion: MAC Spoofed)".to_string()
        } else if low >= 1 {
            "VM (CPU Level)".to_string()
        } else {
            "High-Sophistication Evasion (Hidden Firmware and MAC)".to_string()
        };
        (Verdict::Block, reason)
    } else if high >= 1 {
        let reason = if low >= 1 {
            "VM detected (firmware/PCI/kernel signal, MAC also spoofed)".to_string()
        } else {
            "Virtual machine detected".to_string()
        };
        (Verdict::Block, reason)
    } else if low >= 1 {
        (Verdict::Flag, "Suspicious environment (manual review)".to_string())
    } else {
        (Verdict::Allow, "No virtualization or sandbox signals found".to_string())
    };

    DetectionResult {
        critical,
        high,
        medium: 0,
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

    fn hit(name: &str, tier: Tier) -> TechniqueResult {
        TechniqueResult::hit(name, tier, "test")
    }

    #[test]
    fn any_critical_blocks() {
        let result = fuse(vec![hit("CPUID Hypervisor Bit", Tier::Critical)]);
        assert_eq!(result.verdict, Verdict::Block);
    }

    #[test]
    fn virtual_registry_hit_gets_sandbox_reason() {
        let result = fuse(vec![hit("Virtual Registry Detection", Tier::Critical)]);
        assert_eq!(result.verdict, Verdict::Block);
        assert_eq!(result.reason, "Sandbox isolation detected");
    }

    #[test]
    fn any_high_blocks_without_needing_a_second_high() {
        let result = fuse(vec![hit("PCI Device Detection", Tier::High)]);
        assert_eq!(result.verdict, Verdict::Block);
    }

    #[test]
    fn critical_branch_reason_covers_all_high_low_combinations() {
        let critical = hit("CPUID Hypervisor Bit", Tier::Critical);

        let high_and_low = fuse(vec![critical.clone(), hit("PCI Device Detection", Tier::High), hit("MAC Address Check", Tier::Low)]);
        assert_eq!(high_and_low.reason, "Standard VM (No Evasion)");

        let high_only = fuse(vec![critical.clone(), hit("PCI Device Detection", Tier::High)]);
        assert_eq!(high_only.reason, "VM (Lazy Evasion: MAC Spoofed)");

        let low_only = fuse(vec![critical.clone(), hit("MAC Address Check", Tier::Low)]);
        assert_eq!(low_only.reason, "VM (CPU Level)");

        let neither = fuse(vec![critical]);
        assert_eq!(neither.reason, "High-Sophistication Evasion (Hidden Firmware and MAC)");
    }

    #[test]
    fn only_low_flags() {
        let result = fuse(vec![hit("MAC Address Check", Tier::Low)]);
        assert_eq!(result.verdict, Verdict::Flag);
    }

    #[test]
    fn nothing_detected_allows() {
        let result = fuse(vec![TechniqueResult::clean("CPUID Hypervisor Bit", "clean")]);
        assert_eq!(result.verdict, Verdict::Allow);
    }

    #[test]
    fn scenario_s3_mac_and_pci_blocks_as_standard_vm() {
        let result = fuse(vec![hit("MAC Address Check", Tier::Low), hit("PCI Device Detection", Tier::High)]);
        assert_eq!(result.verdict, Verdict::Block);
    }
}
