use crate::detector::{Detector, Tier, TechniqueResult};
use crate::platform;

/// Exact (vendor, device) pairs checked before the vendor-only fallback.
const VM_PCI_SIGNATURES: &[(u16, u16, &str)] = &[
    (0x80EE, 0xCAFE, "VirtualBox Graphics Adapter"),
    (0x80EE, 0xBEEF, "VirtualBox VGA"),
    (0x15AD, 0x0405, "VMware SVGA II"),
    (0x1AF4, 0x1000, "virtio network device"),
    (0x1414, 0x5353, "Hyper-V Synthetic VGA"),
];

/// Vendor ids alone treated as a VM signal when no exact pair matches.
const VM_VENDOR_IDS: &[(u16, &str)] = &[
    (0x80EE, "VirtualBox"),
    (0x15AD, "VMware"),
    (0x1AF4, "virtio (QEMU/KVM)"),
    (0x1B36, "Red Hat / QEMU"),
    (0x1AB8, "Parallels"),
    (0x5853, "Xen"),
    (0x1414, "Hyper-V"),
];

pub struct PciDeviceDetector;

impl Detector for PciDeviceDetector {
    fn name(&self) -> &str {
        "PCI Device Detection"
    }

    fn scan(&self) -> TechniqueResult {
        let ids = platform::pci_ids();
        if ids.is_empty() {
            return TechniqueResult::skipped(self.name(), "No PCI enumeration available on this platform");
        }

        for id in &ids {
            if let Some((_, _, label)) = VM_PCI_SIGNATURES
                .iter()
                .find(|(v, d, _)| *v == id.vendor && *d == id.device)
            {
                return TechniqueResult::hit(
                    self.name(),
                    Tier::High,
                    format!("Known virtual device present: {} ({:#06x}:{:#06x})", label, id.vendor, id.device),
                );
            }
        }
        for id in &ids {
            if let Some((_, label)) = VM_VENDOR_IDS.iter().find(|(v, _)| *v == id.vendor) {
                return TechniqueResult::hit(
                    self.name(),
                    Tier::High,
                    format!("Virtual PCI vendor present: {} ({:#06x})", label, id.vendor),
                );
            }
        }

        TechniqueResult::clean(self.name(), "No virtual PCI device or vendor found")
    }
}
