use super::cpu::cpu_vendor_id;
use crate::detector::{Detector, Tier, TechniqueResult};
use crate::platform::{self, FirmwareTable};

const VM_SIGNATURES: &[&str] = &["VMWARE", "VIRTUALBOX", "VBOX", "QEMU", "KVM", "BOCHS", "XEN", "PARALLELS", "INNOTEK"];
const HARDENER_MARKER: &str = "777777";
const AMD_SHORT: &str = "Advanced Micro Devices";
const AMD_FULL: &str = "Advanced Micro Devices, Inc.";
const HPET_ACPI_ID: u32 = 0x5445_5048; // "HPET" little-endian as u32.

const FALLBACK_KEYWORDS: &[&str] = &["vmware", "virtualbox", "qemu", "kvm", "hyper-v", "xen", "parallels", "innotek"];

pub struct FirmwareTableDetector;

impl Detector for FirmwareTableDetector {
    fn name(&self) -> &str {
        "Firmware Table Scan"
    }

    fn scan(&self) -> TechniqueResult {
        let acpi_tables = platform::firmware_tables("ACPI");
        if acpi_tables.is_empty() {
            return self.fallback_scan();
        }

        let cpu_vendor = cpu_vendor_id();
        let mut acpi_ids = Vec::new();
        for table in &acpi_tables {
            if table.bytes.len() >= 4 {
                acpi_ids.push(u32::from_le_bytes([
                    table.bytes[0],
                    table.bytes[1],
                    table.bytes[2],
                    table.bytes[3],
                ]));
            }
            if let Some(result) = scan_table(self.name(), table, &cpu_vendor) {
                return result;
            }
        }

        if !acpi_ids.contains(&HPET_ACPI_ID) {
            return TechniqueResult::hit(
                self.name(),
                Tier::High,
                "HPET table absent from ACPI firmware (clean-but-flagged)",
            );
        }

        TechniqueResult::clean(self.name(), "No VM signature found in firmware tables")
    }
}

impl FirmwareTableDetector {
    fn fallback_scan(&self) -> TechniqueResult {
        // Best-effort DMI/WMI fallback when direct ACPI/RSMB enumeration
        // is unavailable (non-Windows, non-Linux, or a permissions gap).
        let rsmb_tables = platform::firmware_tables("RSMB");
        for table in &rsmb_tables {
            let text = String::from_utf8_lossy(&table.bytes).to_lowercase();
            if FALLBACK_KEYWORDS.iter().any(|kw| text.contains(kw)) {
                return TechniqueResult::hit(
                    self.name(),
                    Tier::High,
                    "VM keyword found in DMI/WMI firmware fallback fields",
                );
            }
        }
        TechniqueResult::skipped(self.name(), "No firmware table provider available on this platform")
    }
}

fn scan_table(name: &str, table: &FirmwareTable, cpu_vendor: &str) -> Option<TechniqueResult> {
    let text_upper = String::from_utf8_lossy(&table.bytes).to_uppercase();
    for sig in VM_SIGNATURES {
        if *sig == "XEN" {
            if text_upper.contains("XEN") && !text_upper.contains("PXEN") {
                return Some(TechniqueResult::hit(
                    name,
                    Tier::High,
                    format!("VM brand signature '{}' found in firmware table '{}'", sig, table.signature),
                ));
            }
            continue;
        }
        if text_upper.contains(sig) {
            return Some(TechniqueResult::hit(
                name,
                Tier::High,
                format!("VM brand signature '{}' found in firmware table '{}'", sig, table.signature),
            ));
        }
    }

    if table.bytes.len() >= 24 {
        let oemid = String::from_utf8_lossy(&table.bytes[10..16]);
        let oem_table_id = String::from_utf8_lossy(&table.bytes[16..24]);
        if oemid.contains(HARDENER_MARKER) || oem_table_id.contains(HARDENER_MARKER) {
            return Some(TechniqueResult::hit(
                name,
                Tier::High,
                "Hardening tool marker '777777' found in OEMID/OEMTableID",
            ));
        }
    }

    let contains_amd_short = text_upper.to_lowercase().contains(&AMD_SHORT.to_lowercase());
    let contains_amd_full = text_upper.to_lowercase().contains(&AMD_FULL.to_lowercase());
    let non_amd_host = cpu_vendor != "AuthenticAMD" && !cpu_vendor.is_empty();
    if (contains_amd_short && !contains_amd_full) || (non_amd_host && (contains_amd_short || contains_amd_full)) {
        return Some(TechniqueResult::hit(
            name,
            Tier::High,
            "AMD vendor string present in firmware on a non-AMD host (spoofing indicator)",
        ));
    }

    if table.signature == "FACP" {
        if table.bytes.len() >= 84 {
            let header_len = u32::from_le_bytes([table.bytes[4], table.bytes[5], table.bytes[6], table.bytes[7]]);
            if header_len as usize > table.bytes.len() {
                return Some(TechniqueResult::hit(
                    name,
                    Tier::High,
                    "FADT header length exceeds actual table length",
                ));
            }
            let p_lvl2_lat = u16::from_le_bytes([table.bytes[80], table.bytes[81]]);
            let p_lvl3_lat = u16::from_le_bytes([table.bytes[82], table.bytes[83]]);
            if p_lvl2_lat == 0x0FFF || p_lvl3_lat == 0x0FFF {
                return Some(TechniqueResult::hit(
                    name,
                    Tier::High,
                    "FADT power-management latency fields carry the VM sentinel value 0x0FFF",
                ));
            }
        } else {
            return Some(TechniqueResult::hit(
                name,
                Tier::High,
                "FADT table shorter than the documented minimum of 84 bytes",
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_brand_signature_case_insensitively() {
        let table = FirmwareTable {
            signature: "OEM1".to_string(),
            bytes: b"some bytes mentioning vmware bios".to_vec(),
        };
        let result = scan_table("Firmware Table Scan", &table, "GenuineIntel").expect("expected a hit");
        assert!(result.detected);
        assert_eq!(result.tier, Tier::High);
    }

    #[test]
    fn xen_requires_absence_of_pxen() {
        let table = FirmwareTable {
            signature: "OEM1".to_string(),
            bytes: b"this table mentions pxenloader but not the hypervisor".to_vec(),
        };
        assert!(scan_table("Firmware Table Scan", &table, "GenuineIntel").is_none());
    }

    #[test]
    fn fadt_sentinel_latency_value_is_flagged() {
        let mut bytes = vec![0u8; 84];
        bytes[0..4].copy_from_slice(b"FACP");
        bytes[4..8].copy_from_slice(&84u32.to_le_bytes());
        bytes[80..82].copy_from_slice(&0x0FFFu16.to_le_bytes());
        let table = FirmwareTable {
            signature: "FACP".to_string(),
            bytes,
        };
        let result = scan_table("Firmware Table Scan", &table, "GenuineIntel").expect("expected a hit");
        assert!(result.details.contains("0x0FFF"));
    }

    #[test]
    fn full_amd_string_on_a_non_amd_host_is_spoofing_evidence() {
        let table = FirmwareTable {
            signature: "OEM1".to_string(),
            bytes: b"Manufacturer: Advanced Micro Devices, Inc.".to_vec(),
        };
        let result = scan_table("Firmware Table Scan", &table, "GenuineIntel").expect("expected a hit");
        assert!(result.details.contains("spoofing"));
    }

    #[test]
    fn full_amd_string_on_a_genuine_amd_host_is_not_flagged() {
        let table = FirmwareTable {
            signature: "OEM1".to_string(),
            bytes: b"Manufacturer: Advanced Micro Devices, Inc.".to_vec(),
        };
        assert!(scan_table("Firmware Table Scan", &table, "AuthenticAMD").is_none());
    }
}
