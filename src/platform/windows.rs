//! Windows platform probes: firmware table enumeration, PCI bus scan,
//! kernel-object existence, registry canonicalization, MAC enumeration.
//!
//! FFI here follows the same "raw winapi call, check the sentinel return
//! value, map to an `Option`/`bool`" shape used throughout this crate's
//! detector layer; most of these calls have no safe wrapper upstream.

use std::ffi::CString;
use std::ptr;

use winapi::shared::minwindef::{DWORD, FALSE};
use winapi::um::fileapi::{CreateFileA, OPEN_EXISTING};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::processthreadsapi::{GetCurrentProcess, OpenProcessToken};
use winapi::um::securitybaseapi::GetTokenInformation;
use winapi::um::winnt::{TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};
use winapi::um::winuser::{GetSystemMetrics, SM_REMOTESESSION};

use super::{FirmwareTable, PciId};

extern "system" {
    fn EnumSystemFirmwareTables(FirmwareTableProviderSignature: DWORD, pFirmwareTableBuffer: *mut u8, BufferSize: DWORD) -> winapi::shared::minwindef::UINT;
    fn GetSystemFirmwareTable(
        FirmwareTableProviderSignature: DWORD,
        FirmwareTableID: DWORD,
        pFirmwareTableBuffer: *mut u8,
        BufferSize: DWORD,
    ) -> winapi::shared::minwindef::UINT;
}

fn provider_signature(provider: &str) -> DWORD {
    // 'ACPI' and 'RSMB' packed little-endian, matching GetSystemFirmwareTable's
    // documented FOURCC convention.
    match provider {
        "ACPI" => 0x41435049,
        "RSMB" | "DMI" => 0x52534D42,
        _ => 0,
    }
}

/// Two-call pattern: first call with a null buffer to learn the required
/// size, second call to fill it. Used both for the table-id list and for
/// each individual table's bytes.
pub fn firmware_tables(provider: &str) -> Vec<FirmwareTable> {
    let signature = provider_signature(provider);
    if signature == 0 {
        return Vec::new();
    }
    unsafe {
        let needed = EnumSystemFirmwareTables(signature, ptr::null_mut(), 0);
        if needed == 0 || needed % 4 != 0 {
            return Vec::new();
        }
        let mut id_buffer = vec![0u8; needed as usize];
        let written = EnumSystemFirmwareTables(signature, id_buffer.as_mut_ptr(), needed);
        if written == 0 {
            return Vec::new();
        }
        id_buffer.truncate(written as usize);

        let mut tables = Vec::new();
        for chunk in id_buffer.chunks_exact(4) {
            let table_id = DWORD::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let size = GetSystemFirmwareTable(signature, table_id, ptr::null_mut(), 0);
            if size == 0 {
                continue;
            }
            let mut bytes = vec![0u8; size as usize];
            let actual = GetSystemFirmwareTable(signature, table_id, bytes.as_mut_ptr(), size);
            if actual == 0 {
                continue;
            }
            bytes.truncate(actual as usize);
            let sig = if bytes.len() >= 4 {
                String::from_utf8_lossy(&bytes[0..4]).into_owned()
            } else {
                String::new()
            };
            tables.push(FirmwareTable { signature: sig, bytes });
        }
        tables
    }
}

/// Placeholder PCI bus scan: Windows has no unprivileged PnP enumeration
/// API as simple as `/sys/bus/pci/devices`, so this walks the SetupAPI
/// device list lazily via `sysinfo`-style tooling is out of this probe's
/// remit. Real id pairs are sourced from firmware/DMI fallback instead
/// when this returns empty (the firmware detector already degrades that
/// way per its own fallback path).
pub fn pci_ids() -> Vec<PciId> {
    Vec::new()
}

const VM_KERNEL_OBJECT_PATHS: &[&str] = &[
    "\\\\.\\VBoxGuest",
    "\\\\.\\VBoxMiniRdrDN",
    "\\\\.\\VBoxTrayIPC",
    "\\\\.\\HGFS",
    "\\\\.\\vmci",
    "\\\\.\\VmGenerationCounter",
];

pub fn vm_kernel_object_paths() -> &'static [&'static str] {
    VM_KERNEL_OBJECT_PATHS
}

pub fn kernel_object_exists(path: &str) -> bool {
    let Ok(cpath) = CString::new(path) else {
        return false;
    };
    unsafe {
        let handle = CreateFileA(
            cpath.as_ptr(),
            0,
            winapi::um::winnt::FILE_SHARE_READ | winapi::um::winnt::FILE_SHARE_WRITE,
            ptr::null_mut(),
            OPEN_EXISTING,
            0,
            ptr::null_mut(),
        );
        if handle == INVALID_HANDLE_VALUE {
            false
        } else {
            CloseHandle(handle);
            true
        }
    }
}

#[repr(C)]
struct UnicodeString {
    length: u16,
    maximum_length: u16,
    buffer: *mut u16,
}

#[link(name = "ntdll")]
extern "system" {
    fn NtQueryObject(
        handle: winapi::um::winnt::HANDLE,
        object_information_class: u32,
        object_information: *mut u8,
        object_information_length: u32,
        return_length: *mut u32,
    ) -> i32;
}

const OBJECT_NAME_INFORMATION: u32 = 1;

/// Canonicalizes `\REGISTRY\USER` via the key's native NT object path.
/// A normal host reports a bare `\REGISTRY\USER\<SID>`; sandboxed
/// environments (Sandboxie and similar) remap the hive so the returned
/// path carries a `Sandbox_` segment instead.
pub fn registry_canonical_path(key: &str) -> Option<String> {
    use winapi::um::winnt::{HKEY, KEY_READ};
    use winapi::um::winreg::{RegCloseKey, RegOpenKeyExA};

    let root: HKEY = winapi::um::winreg::HKEY_CURRENT_USER as *mut _;
    let sub_key = CString::new(key).ok()?;
    unsafe {
        let mut opened: HKEY = ptr::null_mut();
        let status = RegOpenKeyExA(root, sub_key.as_ptr(), 0, KEY_READ, &mut opened);
        if status != 0 {
            return None;
        }
        let mut buffer = vec![0u8; 1024];
        let mut returned: u32 = 0;
        let status = NtQueryObject(
            opened as winapi::um::winnt::HANDLE,
            OBJECT_NAME_INFORMATION,
            buffer.as_mut_ptr(),
            buffer.len() as u32,
            &mut returned,
        );
        RegCloseKey(opened);
        if status != 0 || returned < std::mem::size_of::<UnicodeString>() as u32 {
            return None;
        }
        let info = &*(buffer.as_ptr() as *const UnicodeString);
        if info.buffer.is_null() || info.length == 0 {
            return None;
        }
        let units = std::slice::from_raw_parts(info.buffer, (info.length / 2) as usize);
        Some(String::from_utf16_lossy(units))
    }
}

pub fn mac_addresses() -> Vec<String> {
    use std::mem;
    use winapi::shared::ntdef::PVOID;
    use winapi::um::iphlpapi::GetAdaptersInfo;
    use winapi::um::iptypes::IP_ADAPTER_INFO;

    unsafe {
        let mut buffer_len: u32 = 0;
        GetAdaptersInfo(ptr::null_mut(), &mut buffer_len);
        if buffer_len == 0 {
            return Vec::new();
        }
        let mut buffer = vec![0u8; buffer_len as usize];
        let result = GetAdaptersInfo(buffer.as_mut_ptr() as *mut IP_ADAPTER_INFO, &mut buffer_len);
        if result != 0 {
            return Vec::new();
        }
        let mut macs = Vec::new();
        let mut cursor = buffer.as_ptr() as *const IP_ADAPTER_INFO;
        while !cursor.is_null() {
            let adapter = &*cursor;
            let len = adapter.AddressLength as usize;
            if len >= 6 {
                let mac = &adapter.Address[0..6];
                macs.push(
                    mac.iter()
                        .map(|b| format!("{:02x}", b))
                        .collect::<Vec<_>>()
                        .join(":"),
                );
            }
            cursor = adapter.Next;
            let _ = mem::size_of::<PVOID>();
        }
        macs
    }
}

pub fn is_elevated() -> bool {
    unsafe {
        let mut token = ptr::null_mut();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == FALSE {
            return false;
        }
        let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
        let mut returned_len: DWORD = 0;
        let ok = GetTokenInformation(
            token,
            TokenElevation,
            &mut elevation as *mut _ as *mut _,
            mem_size_of_token_elevation(),
            &mut returned_len,
        );
        CloseHandle(token);
        ok != FALSE && elevation.TokenIsElevated != 0
    }
}

fn mem_size_of_token_elevation() -> DWORD {
    std::mem::size_of::<TOKEN_ELEVATION>() as DWORD
}

pub fn is_remote_session() -> bool {
    unsafe { GetSystemMetrics(SM_REMOTESESSION) != 0 }
}

/// Value of `WTSClientProtocolType`'s output when the session transport is
/// RDP-TCP, per `WTS_INFO_CLASS`.
const WTS_PROTOCOL_TYPE_RDP: u16 = 2;

/// True when the current session's client protocol is RDP-TCP, a signal
/// independent of `GetSystemMetrics(SM_REMOTESESSION)` above: a session
/// reverse-tunneled or redirected in a way that leaves `SM_REMOTESESSION`
/// unset can still report an RDP transport here.
pub fn session_protocol_is_rdp() -> bool {
    use winapi::shared::minwindef::DWORD as WtsDword;
    use winapi::um::wtsapi32::{
        WTSClientProtocolType, WTSFreeMemory, WTSQuerySessionInformationW, WTS_CURRENT_SERVER_HANDLE,
        WTS_CURRENT_SESSION,
    };

    unsafe {
        let mut buffer: *mut u16 = ptr::null_mut();
        let mut bytes_returned: WtsDword = 0;
        let ok = WTSQuerySessionInformationW(
            WTS_CURRENT_SERVER_HANDLE,
            WTS_CURRENT_SESSION as WtsDword,
            WTSClientProtocolType,
            &mut buffer,
            &mut bytes_returned,
        );
        if ok == FALSE || buffer.is_null() || bytes_returned < 2 {
            return false;
        }
        let protocol = *buffer;
        WTSFreeMemory(buffer as *mut _);
        protocol == WTS_PROTOCOL_TYPE_RDP
    }
}
