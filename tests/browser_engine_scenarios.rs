//! End-to-end scenarios against `BrowserMonitorEngine`, driven entirely
//! through `violations.json` fixtures rather than a real extension.

use integritywatch::config::Config;
use integritywatch::browser_monitor::BrowserMonitorEngine;
use integritywatch::detector::Verdict;

fn write_violations(dir: &std::path::Path, json: &str) {
    std::fs::write(dir.join("violations.json"), json).unwrap();
}

/// S6 — mixed signals under a permissive config: a rapid-switch-free tab
/// event and a malicious extension, both downgraded to flags.
#[test]
fn scenario_s6_permissive_config_yields_a_flag() {
    let dir = tempfile::tempdir().unwrap();
    write_violations(
        dir.path(),
        r#"[
            {"type":"SUSPICIOUS_TAB_ACTIVATED","timestamp":1000,"details":{"url":"https://meet.google.com/"}},
            {"type":"MALICIOUS_EXTENSION_DETECTED","timestamp":2000,"details":{"extensionName":"X","permissions":["tabs"]}}
        ]"#,
    );

    let mut config = Config::default();
    config.browser.allow_suspicious_websites = true;
    config.browser.allow_suspicious_extensions = true;

    let engine = BrowserMonitorEngine::new(&config, dir.path().to_path_buf(), "session-s6".to_string());
    let result = engine.run();

    assert_eq!(result.verdict, Verdict::Flag);
    assert_eq!(result.reason, "Multiple violations detected (2 types) – Manual Review Required");
    assert_eq!(result.session_id.as_deref(), Some("session-s6"));
}

#[test]
fn strict_config_blocks_the_same_input() {
    let dir = tempfile::tempdir().unwrap();
    write_violations(
        dir.path(),
        r#"[{"type":"SUSPICIOUS_TAB_ACTIVATED","timestamp":1000,"details":{"url":"https://meet.google.com/"}}]"#,
    );

    let config = Config::default();
    let engine = BrowserMonitorEngine::new(&config, dir.path().to_path_buf(), "session-strict".to_string());
    let result = engine.run();

    assert_eq!(result.verdict, Verdict::Block);
}

#[test]
fn missing_violations_file_is_clean_allow() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let engine = BrowserMonitorEngine::new(&config, dir.path().to_path_buf(), "session-clean".to_string());
    let result = engine.run();

    assert_eq!(result.verdict, Verdict::Allow);
    assert_eq!(result.reason, "Clean exam session");
}

/// Monitoring-mode watermark: an unchanged `violations.json` between two
/// `check_current_state()` calls reports SKIPPED the second time.
#[test]
fn monitoring_pass_skips_when_nothing_new_arrived() {
    let dir = tempfile::tempdir().unwrap();
    write_violations(
        dir.path(),
        r#"[{"type":"SUSPICIOUS_TAB_ACTIVATED","timestamp":1000,"details":{"url":"https://meet.google.com/"}}]"#,
    );
    let config = Config::default();
    let engine = BrowserMonitorEngine::new(&config, dir.path().to_path_buf(), "session-watermark".to_string());

    let first = engine.check_current_state();
    assert_eq!(first.verdict, Verdict::Block);

    let second = engine.check_current_state();
    assert_eq!(second.verdict, Verdict::Skipped);
}

/// Before the native host has ever written `violations.json`, monitoring
/// reports SKIPPED rather than a clean ALLOW.
#[test]
fn monitoring_pass_waits_for_the_host_before_it_has_written_anything() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let engine = BrowserMonitorEngine::new(&config, dir.path().to_path_buf(), "session-wait".to_string());

    let result = engine.check_current_state();
    assert_eq!(result.verdict, Verdict::Skipped);
    assert_eq!(result.reason, "Waiting for browser monitoring to start");
}
