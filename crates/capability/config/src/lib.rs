//! 应用运行配置加载：YAML 文件 + `MC_*` 环境变量覆盖。

use domain::{GeoLocation, PluginConfig, ServiceFilter};
use mc_bus::BusOptions;
use mc_telemetry::LoggerOptions;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// secret 规范化后的长度。
pub const SECRET_LENGTH: usize = 32;

const DEFAULT_DATA_DIR: &str = "./mc_home/data";
const DEFAULT_LOGS_DIR: &str = "./mc_home/logs";

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("io error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("parse error: {0}")]
    Parse(String),
}

/// 数据与日志根目录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Directories {
    pub data: PathBuf,
    pub logs: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            data: PathBuf::from(DEFAULT_DATA_DIR),
            logs: PathBuf::from(DEFAULT_LOGS_DIR),
        }
    }
}

impl Directories {
    /// 确保目录存在。
    pub fn ensure(&self) -> Result<(), ConfigError> {
        for dir in [&self.data, &self.logs] {
            std::fs::create_dir_all(dir).map_err(|err| ConfigError::Io {
                path: dir.display().to_string(),
                message: err.to_string(),
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleOptions {
    pub location: Option<GeoLocation>,
}

/// 应用运行配置。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub secret: String,
    pub directories: Directories,
    pub logger: LoggerOptions,
    pub bus: BusOptions,
    /// HTTP 监听配置，核心服务不解释。
    pub web: PluginConfig,
    pub storage: PluginConfig,
    pub metric: PluginConfig,
    pub gateway: ServiceFilter,
    pub handler: ServiceFilter,
    pub task: ServiceFilter,
    pub analytics: PluginConfig,
    pub schedule: ScheduleOptions,
}

impl AppConfig {
    /// 读取配置文件并应用环境变量覆盖。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        debug!(target: "mc.config", path = %path.display(), "config_file_read");
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = if raw.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?
        };
        config.with_env_overrides()?.validate()
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(secret) = read_optional("MC_SECRET") {
            self.secret = secret;
        }
        if let Some(data) = read_optional("MC_DATA_DIR") {
            self.directories.data = PathBuf::from(data);
        }
        if let Some(logs) = read_optional("MC_LOGS_DIR") {
            self.directories.logs = PathBuf::from(logs);
        }
        if let Some(level) = read_optional("MC_LOG_LEVEL") {
            self.logger.level = level;
        }
        if let Some(backend) = read_optional("MC_BUS_TYPE") {
            self.bus.backend = backend;
        }
        if let Some(prefix) = read_optional("MC_BUS_TOPIC_PREFIX") {
            self.bus.topic_prefix = prefix;
        }
        if let Some(url) = read_optional("MC_BUS_SERVER_URL") {
            self.bus.server_url = url;
        }
        let latitude = read_optional_f64("MC_LATITUDE")?;
        let longitude = read_optional_f64("MC_LONGITUDE")?;
        if latitude.is_some() || longitude.is_some() {
            let current = self.schedule.location.unwrap_or_default();
            self.schedule.location = Some(GeoLocation {
                latitude: latitude.unwrap_or(current.latitude),
                longitude: longitude.unwrap_or(current.longitude),
            });
        }
        Ok(self)
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        self.secret = normalize_secret(&self.secret)?;
        if self.directories.data.as_os_str().is_empty() {
            self.directories.data = PathBuf::from(DEFAULT_DATA_DIR);
        }
        if self.directories.logs.as_os_str().is_empty() {
            self.directories.logs = PathBuf::from(DEFAULT_LOGS_DIR);
        }
        if let Some(location) = self.schedule.location {
            if !(-90.0..=90.0).contains(&location.latitude) {
                return Err(ConfigError::Invalid(
                    "schedule.location.latitude".to_string(),
                    location.latitude.to_string(),
                ));
            }
            if !(-180.0..=180.0).contains(&location.longitude) {
                return Err(ConfigError::Invalid(
                    "schedule.location.longitude".to_string(),
                    location.longitude.to_string(),
                ));
            }
        }
        Ok(self)
    }
}

/// 去除首尾空白后按 32 字符补 `x` 或截断。
pub fn normalize_secret(secret: &str) -> Result<String, ConfigError> {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing("secret".to_string()));
    }
    let mut normalized: String = trimmed.chars().take(SECRET_LENGTH).collect();
    let length = normalized.chars().count();
    normalized.extend(std::iter::repeat_n('x', SECRET_LENGTH - length));
    Ok(normalized)
}

fn read_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_optional_f64(key: &str) -> Result<Option<f64>, ConfigError> {
    match read_optional(key) {
        Some(value) => value
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_padded_or_truncated() {
        assert_eq!(normalize_secret("  abc ").expect("pad"), format!("abc{}", "x".repeat(29)));
        let long = "a".repeat(40);
        assert_eq!(normalize_secret(&long).expect("truncate"), "a".repeat(32));
        assert!(matches!(normalize_secret("   "), Err(ConfigError::Missing(_))));
    }
}
