//! MyController 服务端入口。

mod cli;
mod runtime;

use clap::Parser;
use cli::{Cli, Command, VersionInfo};
use mc_config::AppConfig;
use mc_telemetry::init_tracing;
use runtime::Runtime;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Some(Command::Version) = cli.command {
        match serde_json::to_string(&VersionInfo::current()) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("failed to encode version: {err}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let path = cli.config_path();
    let config = match AppConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logger);
    info!(target: "mc.server", mode = %cli.mode.as_str(), config = %path.display(), "starting");

    let runtime = match Runtime::start(&config, cli.mode).await {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(target: "mc.server", error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    wait_for_signal().await;
    info!(target: "mc.server", "shutdown_requested");
    runtime.shutdown().await;
    ExitCode::SUCCESS
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(err) => {
                error!(target: "mc.server", error = %err, "sigterm_handler_failed");
            }
        }
    }
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target: "mc.server", error = %err, "ctrl_c_handler_failed");
    }
}
