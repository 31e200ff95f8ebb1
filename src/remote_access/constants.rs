use std::collections::HashMap;

use crate::detector::Tier;

/// Process blocklist by category. Every category here maps to CRITICAL
/// except `conference_tools_sharing`, which is policy-controlled by
/// `remote_access.allow_conference_tools`.
pub fn process_blocklist() -> HashMap<&'static str, &'static [&'static str]> {
    HashMap::from([
        ("commercial_tools", &["teamviewer.exe", "anydesk.exe", "logmein.exe", "gotomypc.exe"][..]),
        ("vnc_variants", &["vncserver.exe", "tightvnc.exe", "realvnc.exe", "winvnc.exe", "ultravnc.exe"][..]),
        ("windows_native", &["mstsc.exe", "rdpclip.exe"][..]),
        ("browser_extensions", &["chromeremotedesktophost.exe"][..]),
        ("admin_tools", &["psexec.exe", "supremo.exe", "rustdesk.exe", "dwservice.exe"][..]),
        ("screen_recording", &["obs64.exe", "obs32.exe", "camtasia.exe", "bandicam.exe"][..]),
        ("virtual_camera", &["splitcamera.exe", "manycam.exe", "e2esoft ivcam.exe", "obs-virtualcam.exe"][..]),
        ("streaming_software", &["xsplit.exe", "streamlabs obs.exe", "nvidia broadcast.exe"][..]),
        ("conference_tools_sharing", &["zoom.exe", "teams.exe", "slack.exe", "discord.exe", "skype.exe"][..]),
    ])
}

pub const CRITICAL_CATEGORIES: &[&str] = &[
    "commercial_tools",
    "vnc_variants",
    "windows_native",
    "browser_extensions",
    "admin_tools",
    "screen_recording",
    "virtual_camera",
    "streaming_software",
];

pub const CONFERENCE_TOOLS_CATEGORY: &str = "conference_tools_sharing";

pub fn tier_for_category(category: &str, allow_conference_tools: bool) -> Tier {
    if category == CONFERENCE_TOOLS_CATEGORY {
        return if allow_conference_tools { Tier::Low } else { Tier::Critical };
    }
    if CRITICAL_CATEGORIES.contains(&category) {
        Tier::Critical
    } else {
        Tier::Unknown
    }
}

/// local-or-remote ports treated as an immediate CRITICAL remote-access
/// signal on an ESTABLISHED connection, plus the tool name they identify.
pub fn suspicious_ports() -> HashMap<u16, &'static str> {
    let mut map = HashMap::new();
    map.insert(3389, "RDP");
    for port in 5900..=5905 {
        map.insert(port, "VNC");
    }
    map.insert(5938, "TeamViewer");
    map.insert(6568, "AnyDesk");
    map.insert(7070, "AnyDesk");
    for port in 21116..=21119 {
        map.insert(port, "RustDesk");
    }
    map.insert(11011, "Supremo");
    map.insert(11012, "Supremo");
    map
}

pub const REVERSE_DNS_FALLBACK_PORTS: &[u16] = &[80, 443, 8080, 8443];

pub const COMMON_LEGITIMATE_PORTS: &[u16] = &[20, 21, 22, 25, 53, 110, 143, 465, 587, 993, 995, 3306, 5432];

pub const KNOWN_REMOTE_ACCESS_DOMAINS: &[&str] = &[
    "teamviewer.com",
    "anydesk.com",
    "net.anydesk.com",
    "realvnc.com",
    "tightvnc.com",
    "rustdesk.com",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conference_tools_are_policy_controlled() {
        assert_eq!(tier_for_category(CONFERENCE_TOOLS_CATEGORY, true), Tier::Low);
        assert_eq!(tier_for_category(CONFERENCE_TOOLS_CATEGORY, false), Tier::Critical);
    }

    #[test]
    fn other_blocklist_categories_are_always_critical() {
        for category in CRITICAL_CATEGORIES {
            assert_eq!(tier_for_category(category, true), Tier::Critical);
        }
    }

    #[test]
    fn suspicious_ports_cover_the_teamviewer_port() {
        assert_eq!(suspicious_ports().get(&5938), Some(&"TeamViewer"));
    }
}
