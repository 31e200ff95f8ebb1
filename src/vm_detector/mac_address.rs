use crate::detector::{Detector, Tier, TechniqueResult};
use crate::platform;

/// First three octets of well-known virtualization/cloud OUIs.
const VM_MAC_PREFIXES: &[(&str, &str)] = &[
    ("00:05:69", "VMware"),
    ("00:0C:29", "VMware"),
    ("00:1C:14", "VMware"),
    ("00:50:56", "VMware"),
    ("08:00:27", "VirtualBox"),
    ("0A:00:27", "VirtualBox"),
    ("00:03:FF", "Hyper-V"),
    ("00:15:5D", "Hyper-V"),
    ("52:54:00", "QEMU/KVM"),
    ("00:16:3E", "Xen"),
    ("00:1C:42", "Parallels"),
    ("02:00:00", "Amazon EC2 (legacy)"),
    ("02:01:00", "Amazon EC2"),
    ("12:00:00", "Amazon EC2"),
    ("12:01:00", "Amazon EC2"),
    ("42:01:0A", "Google Cloud"),
    ("00:0D:3A", "Microsoft Azure"),
    ("50:6B:8D", "Nutanix AHV"),
    ("BC:24:11", "Proxmox"),
];

pub struct MacAddressDetector;

impl Detector for MacAddressDetector {
    fn name(&self) -> &str {
        "MAC Address Check"
    }

    fn scan(&self) -> TechniqueResult {
        for oui in platform::mac_ouis() {
            if let Some((_, vendor)) = VM_MAC_PREFIXES.iter().find(|(prefix, _)| oui.eq_ignore_ascii_case(prefix)) {
                return TechniqueResult::hit(
                    self.name(),
                    Tier::Low,
                    format!("Network interface MAC OUI matches {} ({})", vendor, oui),
                );
            }
        }
        TechniqueResult::clean(self.name(), "No virtualization MAC OUI found")
    }
}
