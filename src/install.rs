//! Installs the native-messaging host manifest into every detected
//! Chromium-family browser on the host.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

const HOST_NAME: &str = "com.integritywatch.host";
const EXTENSION_ID_PLACEHOLDER: &str = "<extension-id>";

#[derive(Debug, Serialize)]
struct Manifest {
    name: String,
    description: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    allowed_origins: Vec<String>,
}

/// One `NativeMessagingHosts` directory this platform's Chromium-family
/// browsers are known to read manifests from.
fn browser_manifest_dirs() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if cfg!(windows) {
        vec![
            home.join("AppData/Local/Google/Chrome/User Data/NativeMessagingHosts"),
            home.join("AppData/Local/Microsoft/Edge/User Data/NativeMessagingHosts"),
            home.join("AppData/Local/BraveSoftware/Brave-Browser/User Data/NativeMessagingHosts"),
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            home.join("Library/Application Support/Google/Chrome/NativeMessagingHosts"),
            home.join("Library/Application Support/Microsoft Edge/NativeMessagingHosts"),
            home.join("Library/Application Support/BraveSoftware/Brave-Browser/NativeMessagingHosts"),
        ]
    } else {
        vec![
            home.join(".config/google-chrome/NativeMessagingHosts"),
            home.join(".config/microsoft-edge/NativeMessagingHosts"),
            home.join(".config/BraveSoftware/Brave-Browser/NativeMessagingHosts"),
            home.join(".config/chromium/NativeMessagingHosts"),
        ]
    }
}

/// Installs the manifest (and, on Windows, a `.bat` shim plus a registry
/// entry) into every Chromium-family browser directory found on disk.
/// Directories that do not exist are skipped rather than created, so we
/// only register with browsers actually present on the host.
pub fn install(host_binary_path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut installed = Vec::new();

    let wrapped_path = if cfg!(windows) {
        write_windows_shim(host_binary_path)?
    } else {
        host_binary_path.to_path_buf()
    };

    let manifest = Manifest {
        name: HOST_NAME.to_string(),
        description: "IntegrityWatch browser monitoring native host".to_string(),
        path: wrapped_path.display().to_string(),
        kind: "stdio".to_string(),
        allowed_origins: vec![format!("chrome-extension://{}/", EXTENSION_ID_PLACEHOLDER)],
    };
    let manifest_json = serde_json::to_string_pretty(&manifest)?;

    for dir in browser_manifest_dirs() {
        let parent = dir.parent();
        let browser_present = parent.map(|p| p.exists()).unwrap_or(false);
        if !browser_present {
            continue;
        }
        fs::create_dir_all(&dir)?;
        let manifest_path = dir.join(format!("{}.json", HOST_NAME));
        fs::write(&manifest_path, &manifest_json)?;
        installed.push(manifest_path);
    }

    #[cfg(windows)]
    if let Some(manifest_path) = installed.first() {
        register_windows_registry_key(manifest_path)?;
    }

    Ok(installed)
}

#[cfg(windows)]
fn write_windows_shim(host_binary_path: &Path) -> anyhow::Result<PathBuf> {
    let shim_path = host_binary_path.with_extension("bat");
    let contents = format!("@echo off\r\n\"{}\" %*\r\n", host_binary_path.display());
    fs::write(&shim_path, contents)?;
    Ok(shim_path)
}

#[cfg(not(windows))]
fn write_windows_shim(host_binary_path: &Path) -> anyhow::Result<PathBuf> {
    Ok(host_binary_path.to_path_buf())
}

#[cfg(windows)]
fn register_windows_registry_key(manifest_path: &Path) -> anyhow::Result<()> {
    use std::ffi::CString;
    use std::ptr;
    use winapi::um::winnt::{HKEY, KEY_WRITE, REG_SZ};
    use winapi::um::winreg::{RegCloseKey, RegCreateKeyExA, RegSetValueExA, HKEY_LOCAL_MACHINE};

    let sub_key = CString::new(format!(
        "SOFTWARE\\Google\\Chrome\\NativeMessagingHosts\\{}",
        HOST_NAME
    ))?;
    let value = CString::new(manifest_path.display().to_string())?;

    unsafe {
        let mut key: HKEY = ptr::null_mut();
        let status = RegCreateKeyExA(
            HKEY_LOCAL_MACHINE as HKEY,
            sub_key.as_ptr(),
            0,
            ptr::null_mut(),
            0,
            KEY_WRITE,
            ptr::null_mut(),
            &mut key,
            ptr::null_mut(),
        );
        if status != 0 {
            anyhow::bail!("failed to create registry key (status {})", status);
        }
        let bytes = value.as_bytes_with_nul();
        RegSetValueExA(key, ptr::null(), 0, REG_SZ, bytes.as_ptr(), bytes.len() as u32);
        RegCloseKey(key);
    }
    Ok(())
}
