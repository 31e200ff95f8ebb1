//! Linux platform probes: ACPI firmware tables under `/sys/firmware/acpi`,
//! PCI ids under `/sys/bus/pci`, MAC addresses under `/sys/class/net`.

use std::fs;
use std::path::Path;

use super::{FirmwareTable, PciId};

pub fn firmware_tables(provider: &str) -> Vec<FirmwareTable> {
    if provider != "ACPI" {
        return Vec::new();
    }
    let dir = Path::new("/sys/firmware/acpi/tables");
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut tables = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(bytes) = fs::read(&path) else {
            continue;
        };
        if bytes.len() < 4 {
            continue;
        }
        let signature = String::from_utf8_lossy(&bytes[0..4]).into_owned();
        tables.push(FirmwareTable { signature, bytes });
    }
    tables
}

pub fn pci_ids() -> Vec<PciId> {
    let dir = Path::new("/sys/bus/pci/devices");
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut ids = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let vendor = read_hex_id(&path.join("vendor"));
        let device = read_hex_id(&path.join("device"));
        if let (Some(vendor), Some(device)) = (vendor, device) {
            ids.push(PciId { vendor, device });
        }
    }
    ids
}

fn read_hex_id(path: &Path) -> Option<u16> {
    let content = fs::read_to_string(path).ok()?;
    let trimmed = content.trim().trim_start_matches("0x");
    u16::from_str_radix(trimmed, 16).ok()
}

pub fn mac_addresses() -> Vec<String> {
    let dir = Path::new("/sys/class/net");
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut macs = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == "lo" {
            continue;
        }
        let addr_path = entry.path().join("address");
        if let Ok(mac) = fs::read_to_string(addr_path) {
            let mac = mac.trim().to_string();
            if !mac.is_empty() && mac != "00:00:00:00:00:00" {
                macs.push(mac);
            }
        }
    }
    macs
}
