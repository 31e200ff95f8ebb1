use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use integritywatch::config::{self, Config};
use integritywatch::coordinator::{Coordinator, SessionOutcome};
use integritywatch::detector::Verdict;
use integritywatch::install;

#[derive(Parser)]
#[command(name = "integritywatch", about = "Endpoint integrity agent for monitored exams")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, env = "INTEGRITYWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Raise logging verbosity regardless of the config file's level.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Installs native-messaging host manifests into detected browsers.
    Install {
        /// Path to the native host binary to register.
        #[arg(long)]
        host_binary: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration: {}", e);
            return ExitCode::from(1);
        }
    };

    let _log_guard = integritywatch::logging::init(&config.logging, cli.verbose);

    match cli.command {
        Some(Command::Install { host_binary }) => run_install(host_binary),
        None => run_scan_and_monitor(config).await,
    }
}

fn run_install(host_binary: Option<PathBuf>) -> ExitCode {
    let binary_path = host_binary.unwrap_or_else(default_native_host_path);
    match install::install(&binary_path) {
        Ok(paths) => {
            for path in paths {
                println!("installed manifest: {}", path.display());
            }
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("install failed: {}", e);
            ExitCode::from(1)
        }
    }
}

fn default_native_host_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join("integritywatch-native-host")))
        .unwrap_or_else(|| PathBuf::from("integritywatch-native-host"))
}

async fn run_scan_and_monitor(config: Config) -> ExitCode {
    let runtime_dir = config::runtime_dir();
    let heartbeat_sink = Arc::new(|payload: serde_json::Value| {
        tracing::info!(heartbeat = %payload, "monitoring heartbeat");
    });

    let coordinator = Arc::new(Coordinator::new(config, runtime_dir, heartbeat_sink));

    let stop_coordinator = coordinator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop_coordinator.stop();
        }
    });

    let enter_coordinator = coordinator.clone();
    tokio::spawn(async move {
        let mut line = String::new();
        if tokio::task::spawn_blocking(move || std::io::stdin().read_line(&mut line))
            .await
            .is_ok()
        {
            enter_coordinator.stop();
        }
    });

    match coordinator.run().await {
        Ok(SessionOutcome::Completed(Verdict::Block)) => ExitCode::from(1),
        Ok(SessionOutcome::Completed(_)) => ExitCode::from(0),
        Ok(SessionOutcome::Interrupted) => ExitCode::from(130),
        Err(e) => {
            eprintln!("fatal error: {}", e);
            ExitCode::from(1)
        }
    }
}
