//! Runs the three engines once for the baseline, fuses their verdicts,
//! then (if admissible) drives a cancellable periodic monitoring loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::browser_monitor::BrowserMonitorEngine;
use crate::config::Config;
use crate::detector::Verdict;
use crate::native_messaging::state::NativeHostState;
use crate::remote_access::RemoteAccessEngine;
use crate::report::ScanReport;
use crate::vm_detector::VmDetectionEngine;

pub type HeartbeatSink = Arc<dyn Fn(Value) + Send + Sync>;

/// How a `run()` call ended, distinct from the baseline verdict alone: a
/// block discovered mid-monitoring escalates past the baseline, and a
/// user-initiated stop is not a verdict at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(Verdict),
    Interrupted,
}

pub struct Coordinator {
    config: Config,
    runtime_dir: PathBuf,
    session_id: String,
    vm_engine: VmDetectionEngine,
    remote_engine: RemoteAccessEngine,
    browser_engine: Arc<BrowserMonitorEngine>,
    stop_flag: Arc<AtomicBool>,
    user_stopped: Arc<AtomicBool>,
    escalated_block: Arc<AtomicBool>,
    heartbeat_sink: HeartbeatSink,
}

impl Coordinator {
    pub fn new(config: Config, runtime_dir: PathBuf, heartbeat_sink: HeartbeatSink) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let browser_engine = Arc::new(BrowserMonitorEngine::new(&config, runtime_dir.clone(), session_id.clone()));
        Self {
            vm_engine: VmDetectionEngine::new(),
            remote_engine: RemoteAccessEngine::new(&config),
            browser_engine,
            session_id,
            runtime_dir,
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            user_stopped: Arc::new(AtomicBool::new(false)),
            escalated_block: Arc::new(AtomicBool::new(false)),
            heartbeat_sink,
        }
    }

    /// Marks this stop as user-initiated (Ctrl+C or Enter), then sets the
    /// stop flag; a background monitoring loop observes it at its next
    /// cancellable-wait poll and exits within one tick.
    pub fn stop(&self) {
        self.user_stopped.store(true, Ordering::SeqCst);
        self.stop_flag.store(true, Ordering::SeqCst);
        let _ = NativeHostState::write_command(&self.runtime_dir, "STOP_MONITORING");
    }

    /// Runs the baseline scan, persists the report, and (if admissible)
    /// spawns the monitoring loop. Returns how the session ended: the
    /// (possibly monitoring-escalated) verdict, or an interruption if the
    /// user stopped the session before a block was observed.
    pub async fn run(&self) -> anyhow::Result<SessionOutcome> {
        self.reset_runtime_dir()?;
        NativeHostState::write_command(&self.runtime_dir, "START_MONITORING")?;

        let vm_result = self.vm_engine.run();
        tracing::info!(verdict = ?vm_result.verdict, reason = %vm_result.reason, "VM engine baseline complete");

        let remote_result = self.remote_engine.run();
        tracing::info!(verdict = ?remote_result.verdict, reason = %remote_result.reason, "remote-access engine baseline complete");

        let browser_result = self.browser_engine.run();
        tracing::info!(verdict = ?browser_result.verdict, reason = %browser_result.reason, "browser engine baseline complete");

        let final_verdict = fuse_final([vm_result.verdict, remote_result.verdict, browser_result.verdict]);

        let report = ScanReport {
            session_id: self.session_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
            vm_detection: vm_result,
            remote_access: remote_result,
            browser_tab: browser_result,
            final_verdict,
        };

        if self.config.output.save_json {
            let path = PathBuf::from(&self.config.output.json_path);
            if let Err(e) = report.save(&path) {
                tracing::error!(error = %e, "failed to persist scan report");
            }
        }

        if matches!(final_verdict, Verdict::Allow | Verdict::Flag) {
            self.monitor().await;
        }

        if self.escalated_block.load(Ordering::SeqCst) {
            return Ok(SessionOutcome::Completed(Verdict::Block));
        }
        if self.user_stopped.load(Ordering::SeqCst) {
            return Ok(SessionOutcome::Interrupted);
        }
        Ok(SessionOutcome::Completed(final_verdict))
    }

    async fn monitor(&self) {
        let interval = Duration::from_secs(self.config.monitoring.monitoring_interval);
        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }

            let browser_state = self.browser_engine.check_current_state();
            let remote_state = self.remote_engine.check_current_state();

            let is_blocked = browser_state.verdict == Verdict::Block || remote_state.verdict == Verdict::Block;
            let is_flagged = browser_state.verdict == Verdict::Flag || remote_state.verdict == Verdict::Flag;
            let status = if is_blocked {
                "BLOCKED"
            } else if is_flagged {
                "FLAGGED"
            } else {
                "CLEAN"
            };

            (self.heartbeat_sink)(serde_json::json!({
                "timestamp": Utc::now().to_rfc3339(),
                "status": status,
                "browser": browser_state.reason,
                "remote_access": remote_state.reason,
            }));

            if is_blocked {
                tracing::warn!("blocking violation observed during monitoring cycle");
                self.escalated_block.store(true, Ordering::SeqCst);
                self.stop_flag.store(true, Ordering::SeqCst);
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.wait_for_stop() => break,
            }
        }
    }

    async fn wait_for_stop(&self) {
        while !self.stop_flag.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    fn reset_runtime_dir(&self) -> std::io::Result<()> {
        if self.runtime_dir.exists() {
            std::fs::remove_dir_all(&self.runtime_dir)?;
        }
        std::fs::create_dir_all(&self.runtime_dir)
    }
}

fn fuse_final(verdicts: [Verdict; 3]) -> Verdict {
    if verdicts.iter().any(|v| *v == Verdict::Block) {
        Verdict::Block
    } else if verdicts.iter().any(|v| *v == Verdict::Flag) {
        Verdict::Flag
    } else {
        Verdict::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_block_wins_final_fusion() {
        assert_eq!(fuse_final([Verdict::Allow, Verdict::Block, Verdict::Flag]), Verdict::Block);
    }

    #[test]
    fn flag_beats_allow() {
        assert_eq!(fuse_final([Verdict::Allow, Verdict::Allow, Verdict::Flag]), Verdict::Flag);
    }

    #[test]
    fn all_allow_is_allow() {
        assert_eq!(fuse_final([Verdict::Allow, Verdict::Allow, Verdict::Allow]), Verdict::Allow);
    }

    #[test]
    fn escalated_block_outcome_is_not_an_interruption() {
        let escalated_block = Arc::new(AtomicBool::new(true));
        let user_stopped = Arc::new(AtomicBool::new(true));
        let outcome = if escalated_block.load(Ordering::SeqCst) {
            SessionOutcome::Completed(Verdict::Block)
        } else if user_stopped.load(Ordering::SeqCst) {
            SessionOutcome::Interrupted
        } else {
            SessionOutcome::Completed(Verdict::Allow)
        };
        assert_eq!(outcome, SessionOutcome::Completed(Verdict::Block));
    }

    #[test]
    fn user_stop_without_a_block_is_interrupted() {
        let escalated_block = Arc::new(AtomicBool::new(false));
        let user_stopped = Arc::new(AtomicBool::new(true));
        let outcome = if escalated_block.load(Ordering::SeqCst) {
            SessionOutcome::Completed(Verdict::Block)
        } else if user_stopped.load(Ordering::SeqCst) {
            SessionOutcome::Interrupted
        } else {
            SessionOutcome::Completed(Verdict::Allow)
        };
        assert_eq!(outcome, SessionOutcome::Interrupted);
    }
}
