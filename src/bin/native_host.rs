//! Native-messaging host: a separate long-lived process a Chromium-family
//! browser launches to talk to the IntegrityWatch extension over stdio.
//! One task drains stdin into a bounded queue; the main task dispatches
//! frames and polls the coordinator's command file at ~1Hz.

use std::process;
use std::time::Duration;

use integritywatch::config::Config;
use integritywatch::native_messaging::framing;
use integritywatch::native_messaging::state::{
    ExtensionMessage, HostToExtensionConfig, HostToExtensionMessage, NativeHostState, SUSPICIOUS_DOMAINS,
};
use tokio::sync::mpsc;

const QUEUE_CAPACITY: usize = 64;
const COMMAND_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config_path = integritywatch::config::default_config_path();
    let config = Config::load(&config_path).unwrap_or_default();

    let runtime_dir = integritywatch::config::runtime_dir();
    let mut state = NativeHostState::new(runtime_dir);
    if let Err(e) = state.clear() {
        tracing::warn!(error = %e, "failed to clear runtime directory on startup");
    }
    let pid = process::id();
    let _ = state.write_status("RUNNING", pid);

    let mut stdout = tokio::io::stdout();
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(QUEUE_CAPACITY);

    let reader_task = tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        loop {
            match framing::read_message(&mut stdin).await {
                Ok(Some(frame)) => {
                    if tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed frame");
                    continue;
                }
            }
        }
    });

    let mut poll_interval = tokio::time::interval(COMMAND_POLL_INTERVAL);
    loop {
        tokio::select! {
            frame = rx.recv() => {
                match frame {
                    Some(bytes) => dispatch(&mut state, &bytes).await,
                    None => break,
                }
            }
            _ = poll_interval.tick() => {
                if let Some(command) = state.poll_command() {
                    tracing::info!(command = %command.command, "coordinator command consumed");
                    relay_command(&mut stdout, &command.command, &config).await;
                }
            }
        }
    }

    reader_task.abort();
    let _ = state.write_status("STOPPED", pid);
}

/// Relays a consumed `command.json` entry to the extension as a
/// `HostToExtensionMessage` frame over stdout.
async fn relay_command(stdout: &mut tokio::io::Stdout, command: &str, config: &Config) {
    let message = match command {
        "START_MONITORING" => HostToExtensionMessage::StartMonitoring {
            config: HostToExtensionConfig {
                interval: config.monitoring.monitoring_interval,
                target_website: config.browser.target_website.clone(),
                suspicious_domains: SUSPICIOUS_DOMAINS.iter().map(|s| s.to_string()).collect(),
            },
        },
        "STOP_MONITORING" => HostToExtensionMessage::StopMonitoring,
        _ => return,
    };

    let payload = match serde_json::to_vec(&message) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize host-to-extension message");
            return;
        }
    };
    if let Err(e) = framing::write_message(stdout, &payload).await {
        tracing::warn!(error = %e, "failed to relay command to extension");
    }
}

async fn dispatch(state: &mut NativeHostState, frame: &[u8]) {
    let message: ExtensionMessage = match serde_json::from_slice(frame) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "dropping frame with invalid JSON");
            return;
        }
    };

    match message {
        ExtensionMessage::ExtensionReady => {
            tracing::info!("extension connected and ready");
        }
        ExtensionMessage::Heartbeat { timestamp, data } => {
            let total_tabs = data.get("totalTabs").and_then(|v| v.as_u64()).unwrap_or(0);
            let suspicious = data.get("suspiciousTabCount").and_then(|v| v.as_u64()).unwrap_or(0);
            tracing::info!(total_tabs, suspicious, "heartbeat received");
            if let Err(e) = state.write_heartbeat(timestamp, &data) {
                tracing::warn!(error = %e, "failed to write heartbeat.json");
            }
        }
        ExtensionMessage::Violation {
            violation_type,
            timestamp,
            details,
        } => {
            let details_value = serde_json::to_value(details).unwrap_or(serde_json::json!({}));
            if let Err(e) = state.append_violation(&violation_type, timestamp, details_value) {
                tracing::warn!(error = %e, "failed to append violation");
            }
        }
        ExtensionMessage::ScreenShareStopped { data } => {
            let timestamp = chrono::Utc::now().timestamp_millis();
            if let Err(e) = state.append_violation("SCREEN_SHARE_STOPPED", timestamp, data) {
                tracing::warn!(error = %e, "failed to append screen-share-stopped event");
            }
        }
        ExtensionMessage::Pong => {}
        ExtensionMessage::Unknown => {
            tracing::warn!("dropping unrecognized message type");
        }
    }
}
