//! 命令行参数与 `version` 子命令。

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mc-server", about = "MyController server")]
pub struct Cli {
    /// 配置文件路径，默认 `./<mode>.yaml`。
    #[arg(long, env = "MC_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, env = "MC_MODE", default_value_t = Mode::AllInOne)]
    pub mode: Mode,
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("./{}.yaml", self.mode.as_str())))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 打印版本信息（JSON）。
    Version,
}

/// 部署模式，决定启动哪些服务。
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Server,
    Gateway,
    Handler,
    AllInOne,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Server => "server",
            Mode::Gateway => "gateway",
            Mode::Handler => "handler",
            Mode::AllInOne => "all-in-one",
        }
    }

    /// 处理器、调度、资源分发。
    pub fn runs_core(&self) -> bool {
        matches!(self, Mode::Server | Mode::AllInOne)
    }

    pub fn runs_gateway(&self) -> bool {
        matches!(self, Mode::Gateway | Mode::AllInOne)
    }

    pub fn runs_handler(&self) -> bool {
        matches!(self, Mode::Handler | Mode::AllInOne)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub build_date: &'static str,
    pub platform: &'static str,
    pub arch: &'static str,
    pub rustc: &'static str,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_commit: option_env!("MC_GIT_COMMIT").unwrap_or("unknown"),
            build_date: option_env!("MC_BUILD_DATE").unwrap_or("unknown"),
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            rustc: option_env!("MC_RUSTC_VERSION").unwrap_or("unknown"),
        }
    }
}
