use crate::detector::{Detector, Tier, TechniqueResult};

use super::types::{RawViolation, TAB_SWITCHING_TYPES};

/// Host-pattern categories used to label a switched-to tab. These mirror
/// the canonical suspicious-domain list this engine's native host hands
/// the extension at session start.
const COMMUNICATION_PATTERNS: &[&str] = &[
    "meet.google.com",
    "teams.microsoft.com",
    "zoom.us",
    "discord.com",
    "slack.com",
    "whatsapp.com",
    "telegram.org",
    "messenger.com",
    "chat.google.com",
    "hangouts.google.com",
    "whereby.com",
    "jitsi.org",
    "8x8.vc",
    "webex.com",
];

const SEARCH_PATTERNS: &[&str] = &["google.com/search", "bing.com/search", "duckduckgo.com"];

const SOCIAL_PATTERNS: &[&str] = &["facebook.com", "twitter.com", "x.com", "instagram.com", "reddit.com"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlCategory {
    Communication,
    Search,
    Social,
    Other,
}

pub fn categorize_url(url: &str) -> UrlCategory {
    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or(url)
        .to_lowercase();
    let full = url.to_lowercase();
    if COMMUNICATION_PATTERNS.iter().any(|p| host.contains(p)) {
        UrlCategory::Communication
    } else if SEARCH_PATTERNS.iter().any(|p| full.contains(p)) {
        UrlCategory::Search
    } else if SOCIAL_PATTERNS.iter().any(|p| host.contains(p)) {
        UrlCategory::Social
    } else {
        UrlCategory::Other
    }
}

/// Given events ordered by timestamp, returns the maximum density (event
/// count) observed over any 5-event sliding window whose span is <= 60s.
/// Returns 0 when fewer than 5 events are present.
pub fn detect_rapid_switching(timestamps: &[i64]) -> u32 {
    const WINDOW: usize = 5;
    const MAX_SPAN_MS: i64 = 60_000;

    if timestamps.len() < WINDOW {
        return 0;
    }
    let mut sorted = timestamps.to_vec();
    sorted.sort();

    let mut max_density = 0;
    for window in sorted.windows(WINDOW) {
        let span = window[window.len() - 1] - window[0];
        if span <= MAX_SPAN_MS {
            max_density = max_density.max(window.len() as u32);
        }
    }
    max_density
}

pub struct TabSwitchingDetector<'a> {
    violations: &'a [RawViolation],
}

impl<'a> TabSwitchingDetector<'a> {
    pub fn new(violations: &'a [RawViolation]) -> Self {
        Self { violations }
    }
}

impl Detector for TabSwitchingDetector<'_> {
    fn name(&self) -> &str {
        "Tab Switching Detection"
    }

    fn scan(&self) -> TechniqueResult {
        let matches: Vec<&RawViolation> = self
            .violations
            .iter()
            .filter(|v| TAB_SWITCHING_TYPES.contains(&v.violation_type.as_str()))
            .collect();
        if matches.is_empty() {
            return TechniqueResult::clean(self.name(), "No suspicious tab activity detected");
        }

        let mut communication = 0;
        let mut social = 0;
        let mut search = 0;
        for violation in &matches {
            if let Some(url) = violation.url() {
                match categorize_url(url) {
                    UrlCategory::Communication => communication += 1,
                    UrlCategory::Social => social += 1,
                    UrlCategory::Search => search += 1,
                    UrlCategory::Other => {}
                }
            }
        }

        let timestamps: Vec<i64> = matches.iter().map(|v| v.timestamp).collect();
        let rapid_density = detect_rapid_switching(&timestamps);

        let mut details = format!(
            "{} suspicious tab event(s) ({} communication, {} social, {} search)",
            matches.len(),
            communication,
            social,
            search
        );
        if rapid_density > 0 {
            details.push_str(&format!("; rapid switching detected (density {})", rapid_density));
        }

        TechniqueResult::hit(self.name(), Tier::High, details)
            .with_count(matches.len() as u32)
            .with_data("rapid_switch_density", serde_json::json!(rapid_density))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_five_events_returns_zero() {
        assert_eq!(detect_rapid_switching(&[0, 1000, 2000, 3000]), 0);
    }

    #[test]
    fn five_events_within_span_is_detected() {
        let timestamps = [0, 10_000, 20_000, 30_000, 40_000];
        assert_eq!(detect_rapid_switching(&timestamps), 5);
    }

    #[test]
    fn span_over_60s_is_not_counted() {
        let timestamps = [0, 20_000, 40_000, 60_000, 80_000];
        assert_eq!(detect_rapid_switching(&timestamps), 0);
    }

    #[test]
    fn categorizes_communication_domains() {
        assert_eq!(categorize_url("https://meet.google.com/abc-defg"), UrlCategory::Communication);
    }
}
