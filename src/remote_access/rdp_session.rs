use crate::detector::{Detector, Platform, Tier, TechniqueResult};
use crate::platform;

pub struct RdpSessionDetector;

impl Detector for RdpSessionDetector {
    fn name(&self) -> &str {
        "RDP Session Detection"
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Windows]
    }

    fn scan(&self) -> TechniqueResult {
        if platform::is_remote_session() {
            return TechniqueResult::hit(self.name(), Tier::Critical, "GetSystemMetrics(SM_REMOTESESSION) is true");
        }
        if session_protocol_is_rdp() {
            return TechniqueResult::hit(self.name(), Tier::Critical, "WTS session protocol is RDP-TCP");
        }
        TechniqueResult::clean(self.name(), "No active RDP session")
    }

    /// Monitor mode runs only the cheaper metrics check, matching the
    /// baseline's first branch.
    fn monitor(&self) -> TechniqueResult {
        if platform::is_remote_session() {
            return TechniqueResult::hit(self.name(), Tier::Critical, "GetSystemMetrics(SM_REMOTESESSION) is true");
        }
        TechniqueResult::clean(self.name(), "No active RDP session")
    }
}

fn session_protocol_is_rdp() -> bool {
    platform::session_protocol_is_rdp()
}
