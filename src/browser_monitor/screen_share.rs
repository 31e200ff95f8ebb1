use crate::detector::{Detector, Tier, TechniqueResult};

use super::types::{RawViolation, SCREEN_SHARE_DETECTED, SCREEN_SHARE_STOPPED};

pub struct ScreenShareDetector<'a> {
    violations: &'a [RawViolation],
}

impl<'a> ScreenShareDetector<'a> {
    pub fn new(violations: &'a [RawViolation]) -> Self {
        Self { violations }
    }
}

impl Detector for ScreenShareDetector<'_> {
    fn name(&self) -> &str {
        "Screen Sharing Detection"
    }

    fn scan(&self) -> TechniqueResult {
        let shares: Vec<&RawViolation> = self
            .violations
            .iter()
            .filter(|v| v.violation_type == SCREEN_SHARE_DETECTED)
            .collect();
        if shares.is_empty() {
            return TechniqueResult::clean(self.name(), "No screen sharing detected");
        }

        let stops: Vec<&RawViolation> = self
            .violations
            .iter()
            .filter(|v| v.violation_type == SCREEN_SHARE_STOPPED)
            .collect();

        let (duration_seconds, unstopped) = pair_duration(&shares, &stops);

        let urls: Vec<&str> = shares.iter().filter_map(|v| v.url()).take(3).collect();
        let mut details = format!("{} screen sharing session(s) detected, {:.1}s total", shares.len(), duration_seconds);
        if !urls.is_empty() {
            details.push_str(&format!(" on {}", urls.join(", ")));
        }
        if unstopped > 0 {
            details.push_str(&format!("; WARNING: {} session(s) not stopped properly", unstopped));
        }

        TechniqueResult::hit(self.name(), Tier::Critical, details)
            .with_count(shares.len() as u32)
            .with_data("duration_seconds", serde_json::json!(duration_seconds))
    }
}

/// Pairs each share event with the chronologically next stop event
/// (first stop with `timestamp > share.timestamp`), summing deltas in
/// seconds. Returns `(total_seconds, unmatched_share_count)`.
pub fn pair_duration(shares: &[&RawViolation], stops: &[&RawViolation]) -> (f64, usize) {
    let mut sorted_shares = shares.to_vec();
    sorted_shares.sort_by_key(|v| v.timestamp);
    let mut sorted_stops: Vec<i64> = stops.iter().map(|v| v.timestamp).collect();
    sorted_stops.sort();

    let mut total_ms: i64 = 0;
    let mut unmatched = 0;
    let mut stop_cursor = 0;
    for share in &sorted_shares {
        while stop_cursor < sorted_stops.len() && sorted_stops[stop_cursor] <= share.timestamp {
            stop_cursor += 1;
        }
        if stop_cursor < sorted_stops.len() {
            total_ms += sorted_stops[stop_cursor] - share.timestamp;
            stop_cursor += 1;
        } else {
            unmatched += 1;
        }
    }
    (total_ms as f64 / 1000.0, unmatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn violation(kind: &str, timestamp: i64) -> RawViolation {
        RawViolation {
            violation_type: kind.to_string(),
            timestamp,
            detected_at: None,
            details: HashMap::new(),
        }
    }

    #[test]
    fn pairs_each_share_with_the_next_later_stop() {
        let share1 = violation("SCREEN_SHARE_DETECTED", 1_000);
        let share2 = violation("SCREEN_SHARE_DETECTED", 5_000);
        let stop1 = violation("SCREEN_SHARE_STOPPED", 3_000);
        let stop2 = violation("SCREEN_SHARE_STOPPED", 9_000);
        let shares = vec![&share1, &share2];
        let stops = vec![&stop1, &stop2];
        let (duration, unmatched) = pair_duration(&shares, &stops);
        assert_eq!(unmatched, 0);
        assert_eq!(duration, 2.0 + 4.0);
    }

    #[test]
    fn unmatched_share_is_reported() {
        let share1 = violation("SCREEN_SHARE_DETECTED", 1_000);
        let shares = vec![&share1];
        let stops: Vec<&RawViolation> = Vec::new();
        let (duration, unmatched) = pair_duration(&shares, &stops);
        assert_eq!(unmatched, 1);
        assert_eq!(duration, 0.0);
    }

    #[test]
    fn duration_is_non_negative_and_monotonic_in_stops_paired() {
        let share1 = violation("SCREEN_SHARE_DETECTED", 1_000);
        let stop1 = violation("SCREEN_SHARE_STOPPED", 2_000);
        let (one_stop_duration, _) = pair_duration(&[&share1], &[&stop1]);
        assert!(one_stop_duration >= 0.0);
        let (no_stop_duration, _) = pair_duration(&[&share1], &[]);
        assert!(one_stop_duration >= no_stop_duration);
    }
}
