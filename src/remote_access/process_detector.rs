use std::collections::HashSet;
use std::net::IpAddr;

use netstat2::{get_sockets_info, AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState};
use sysinfo::{PidExt, ProcessExt, System, SystemExt};

use crate::config::Config;
use crate::detector::{Detector, Tier, TechniqueResult};

use super::constants::{
    process_blocklist, suspicious_ports, tier_for_category, COMMON_LEGITIMATE_PORTS, KNOWN_REMOTE_ACCESS_DOMAINS,
    REVERSE_DNS_FALLBACK_PORTS,
};

pub struct ProcessDetector {
    allow_conference_tools: bool,
}

impl ProcessDetector {
    pub fn new(config: &Config) -> Self {
        Self {
            allow_conference_tools: config.remote_access.allow_conference_tools,
        }
    }
}

struct Threat {
    name: String,
    tier: Tier,
    reason: String,
}

impl Detector for ProcessDetector {
    fn name(&self) -> &str {
        "Process Detection"
    }

    fn scan(&self) -> TechniqueResult {
        let mut system = System::new_all();
        system.refresh_processes();

        let blocklist = process_blocklist();
        let mut threats: Vec<Threat> = Vec::new();
        let mut matched_pids: HashSet<u32> = HashSet::new();

        for (pid, process) in system.processes() {
            let name = process.name().to_lowercase();
            let pid = pid.as_u32();
            if let Some((category, _)) = blocklist.iter().find(|(_, names)| names.iter().any(|n| *n == name)) {
                let tier = tier_for_category(category, self.allow_conference_tools);
                threats.push(Threat {
                    name: process.name().to_string(),
                    tier,
                    reason: format!("Blocklisted process running: {} ({})", process.name(), category),
                });
                matched_pids.insert(pid);
            }
        }

        if let Ok(sockets) = get_sockets_info(AddressFamilyFlags::IPV4, ProtocolFlags::TCP) {
            let suspicious = suspicious_ports();
            for socket in &sockets {
                let ProtocolSocketInfo::Tcp(tcp) = &socket.protocol_socket_info else {
                    continue;
                };
                if tcp.state != TcpState::Established {
                    continue;
                }
                for pid in &socket.associated_pids {
                    if matched_pids.contains(pid) {
                        continue;
                    }
                    let process_name = system
                        .process(sysinfo::Pid::from_u32(*pid))
                        .map(|p| p.name().to_string())
                        .unwrap_or_else(|| format!("pid {}", pid));

                    if let Some(tool) = suspicious
                        .get(&tcp.local_port)
                        .or_else(|| suspicious.get(&tcp.remote_port))
                    {
                        threats.push(Threat {
                            name: process_name,
                            tier: Tier::Critical,
                            reason: format!("Connecting to {} port {}", tool, tcp.remote_port),
                        });
                        matched_pids.insert(*pid);
                        continue;
                    }

                    if should_reverse_resolve(tcp.remote_port) {
                        if let Some(host) = reverse_dns(tcp.remote_addr) {
                            if KNOWN_REMOTE_ACCESS_DOMAINS.iter().any(|suffix| host.ends_with(suffix)) {
                                threats.push(Threat {
                                    name: process_name,
                                    tier: Tier::Critical,
                                    reason: format!("Connection resolves to known remote-access provider {}", host),
                                });
                                matched_pids.insert(*pid);
                            }
                        }
                    }
                }
            }
        }

        build_result(self.name(), threats)
    }
}

fn should_reverse_resolve(remote_port: u16) -> bool {
    REVERSE_DNS_FALLBACK_PORTS.contains(&remote_port) || !COMMON_LEGITIMATE_PORTS.contains(&remote_port)
}

fn reverse_dns(addr: IpAddr) -> Option<String> {
    dns_lookup::lookup_addr(&addr).ok()
}

fn build_result(name: &str, threats: Vec<Threat>) -> TechniqueResult {
    if threats.is_empty() {
        return TechniqueResult::clean(name, "No remote access tools detected");
    }

    let top_tier = threats.iter().map(|t| t.tier).max().unwrap_or(Tier::Unknown);

    // Surface the diagnostic reason, not just the process name, so e.g.
    // "Connecting to TeamViewer port 5938" reaches the final report
    // instead of being discarded in favor of the bare process name.
    let mut reasons: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for threat in threats.iter().filter(|t| t.tier == top_tier) {
        if seen.insert(threat.reason.clone()) {
            reasons.push(threat.reason.clone());
        }
    }

    let shown: Vec<_> = reasons.iter().take(3).cloned().collect();
    let overflow = reasons.len().saturating_sub(shown.len());
    let mut details = shown.join("; ");
    if overflow > 0 {
        details.push_str(&format!(" (+{} more)", overflow));
    }

    TechniqueResult::hit(name, top_tier, details).with_count(threats.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_threats_is_clean() {
        let result = build_result("Process Detection", Vec::new());
        assert!(!result.detected);
    }

    #[test]
    fn top_tier_wins_and_reasons_are_deduplicated() {
        let threats = vec![
            Threat { name: "teamviewer.exe".to_string(), tier: Tier::Critical, reason: "x".to_string() },
            Threat { name: "teamviewer.exe".to_string(), tier: Tier::Critical, reason: "x".to_string() },
            Threat { name: "zoom.exe".to_string(), tier: Tier::Low, reason: "z".to_string() },
        ];
        let result = build_result("Process Detection", threats);
        assert!(result.detected);
        assert_eq!(result.tier, Tier::Critical);
        assert_eq!(result.count, 3);
        assert_eq!(result.details, "x");
    }

    #[test]
    fn scenario_s5_surfaces_the_port_diagnostic_in_details() {
        let threats = vec![Threat {
            name: "chrome.exe".to_string(),
            tier: Tier::Critical,
            reason: "Connecting to TeamViewer port 5938".to_string(),
        }];
        let result = build_result("Process Detection", threats);
        assert_eq!(result.details, "Connecting to TeamViewer port 5938");
    }
}
