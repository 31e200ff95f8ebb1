use crate::detector::{Detector, Tier, TechniqueResult};
use crate::platform::{cpuid, decode_vendor_string};

const HYPERVISOR_LEAF_BASE: u32 = 0x4000_0000;
const HYPERVISOR_LEAF_KVM: u32 = 0x4000_0100;

/// Known hypervisor vendor strings, CPUID leaf 0x40000000 EBX/ECX/EDX.
const VM_VENDOR_STRINGS: &[(&str, &str)] = &[
    ("VMwareVMware", "VMware"),
    ("Microsoft Hv", "Hyper-V"),
    ("KVMKVMKVM\0\0\0", "KVM"),
    ("VBoxVBoxVBox", "VirtualBox"),
    ("XenVMMXenVMM", "Xen"),
    ("prl hyperv  ", "Parallels"),
    ("bhyve bhyve ", "bhyve"),
    (" QNXQVMBSQG ", "QNX"),
];

const VM_KEYWORDS: &[&str] = &["vmware", "virtualbox", "vbox", "xen", "kvm", "qemu", "hyper-v", "parallels"];

/// The CPU manufacturer id from CPUID leaf 0 (e.g. "GenuineIntel",
/// "AuthenticAMD"), not to be confused with the hypervisor vendor string
/// read from leaf `0x40000000`.
pub fn cpu_vendor_id() -> String {
    let leaf0 = cpuid(0, 0);
    decode_vendor_string(leaf0.ebx, leaf0.edx, leaf0.ecx)
}

pub struct HypervisorBitDetector;

impl Detector for HypervisorBitDetector {
    fn name(&self) -> &str {
        "CPUID Hypervisor Bit"
    }

    fn scan(&self) -> TechniqueResult {
        let leaf1 = cpuid(1, 0);
        let hypervisor_bit = (leaf1.ecx >> 31) & 1 == 1;
        if !hypervisor_bit {
            return TechniqueResult::clean(self.name(), "Hypervisor bit not set");
        }

        // A Hyper-V *host* (or WSL2) also sets this bit; leaf 0x40000000's
        // EAX carries the highest supported hypervisor leaf and is only
        // meaningful (>= 0x40000000) when a hypervisor vendor leaf exists.
        let leaf_base = cpuid(HYPERVISOR_LEAF_BASE, 0);
        if leaf_base.eax < HYPERVISOR_LEAF_BASE {
            return TechniqueResult::clean(
                self.name(),
                "Hypervisor bit set but no VM (Hyper-V host or WSL)",
            );
        }

        TechniqueResult::hit(self.name(), Tier::Critical, "CPUID hypervisor bit set")
    }
}

pub struct VendorStringDetector;

impl Detector for VendorStringDetector {
    fn name(&self) -> &str {
        "CPUID Vendor String"
    }

    fn scan(&self) -> TechniqueResult {
        for leaf in [HYPERVISOR_LEAF_BASE, HYPERVISOR_LEAF_KVM] {
            let result = cpuid(leaf, 0);
            let vendor = decode_vendor_string(result.ebx, result.edx, result.ecx);
            if let Some((_, name)) = VM_VENDOR_STRINGS.iter().find(|(sig, _)| *sig == vendor) {
                return TechniqueResult::hit(
                    self.name(),
                    Tier::Critical,
                    format!("Hypervisor vendor string identifies {}", name),
                );
            }
            let lower = vendor.to_lowercase();
            if VM_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
                return TechniqueResult::hit(
                    self.name(),
                    Tier::Critical,
                    format!("Hypervisor vendor string contains a VM keyword ({})", vendor.trim()),
                );
            }
        }
        TechniqueResult::clean(self.name(), "No known hypervisor vendor string found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_string_decodes_virtualbox() {
        // "VBoxVBoxVBox" split into ebx/edx/ecx order as CPUID lays it out.
        let ebx = u32::from_le_bytes(*b"VBox");
        let edx = u32::from_le_bytes(*b"VBox");
        let ecx = u32::from_le_bytes(*b"VBox");
        assert_eq!(decode_vendor_string(ebx, edx, ecx), "VBoxVBoxVBox");
    }
}
