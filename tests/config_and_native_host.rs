use integritywatch::config::Config;
use integritywatch::native_messaging::state::NativeHostState;

#[test]
fn loading_a_missing_config_writes_and_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    assert!(!path.exists());

    let config = Config::load(&path).unwrap();
    assert!(path.exists());
    assert!(!config.browser.allow_suspicious_extensions);
    assert_eq!(config.monitoring.monitoring_interval, 5);

    // A second load reads the just-written file back unchanged.
    let reloaded = Config::load(&path).unwrap();
    assert_eq!(reloaded.monitoring.monitoring_interval, config.monitoring.monitoring_interval);
}

#[test]
fn native_host_state_roundtrips_violations_and_commands() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = NativeHostState::new(dir.path().to_path_buf());
    state.clear().unwrap();

    state
        .append_violation("SCREEN_SHARE_DETECTED", 1_000, serde_json::json!({"url": "https://example.com"}))
        .unwrap();
    state
        .append_violation("SCREEN_SHARE_STOPPED", 4_000, serde_json::json!({}))
        .unwrap();

    let contents = std::fs::read_to_string(dir.path().join("violations.json")).unwrap();
    let violations: Vec<serde_json::Value> = serde_json::from_str(&contents).unwrap();
    assert_eq!(violations.len(), 2);
    assert_eq!(violations[0]["type"], "SCREEN_SHARE_DETECTED");

    NativeHostState::write_command(dir.path(), "START_MONITORING").unwrap();
    let command = state.poll_command().expect("command should be present");
    assert_eq!(command.command, "START_MONITORING");
    assert!(state.monitoring_active);

    // The command file is consumed on read.
    assert!(state.poll_command().is_none());
}
