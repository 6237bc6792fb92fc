//! 网关配置。

use crate::duration::parse_duration_or;
use crate::error::DomainError;
use crate::labels::Labels;
use crate::model::State;
use crate::plugin::PluginConfig;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 重连间隔默认值。
pub const DEFAULT_RECONNECT_DELAY: &str = "15s";
/// ACK 等待默认超时。
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(200);
/// ACK 等待最小超时。
pub const MIN_ACK_TIMEOUT: Duration = Duration::from_millis(10);

/// 网关：一组设备的连接，绑定一个 provider 插件。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub reconnect_delay: String,
    #[serde(default)]
    pub queue_failed_message: bool,
    #[serde(default)]
    pub provider: PluginConfig,
    #[serde(default)]
    pub state: State,
}

impl GatewayConfig {
    pub fn provider_type(&self) -> &str {
        self.provider.plugin_type()
    }

    /// 空白时回填默认重连间隔。
    pub fn apply_defaults(&mut self) {
        if self.reconnect_delay.trim().is_empty() {
            self.reconnect_delay = DEFAULT_RECONNECT_DELAY.to_string();
        }
    }

    pub fn reconnect_delay(&self) -> Result<Duration, DomainError> {
        parse_duration_or(&self.reconnect_delay, Duration::from_secs(15))
    }

    /// provider 配置中的 `timeout`；默认 200ms，最小 10ms。
    pub fn ack_timeout(&self) -> Duration {
        let timeout = self
            .provider
            .get_str("timeout")
            .and_then(|raw| parse_duration_or(raw, DEFAULT_ACK_TIMEOUT).ok())
            .unwrap_or(DEFAULT_ACK_TIMEOUT);
        timeout.max(MIN_ACK_TIMEOUT)
    }
}

impl Resource for GatewayConfig {
    fn resource_id(&self) -> &str {
        &self.id
    }

    fn resource_kind(&self) -> &str {
        self.provider_type()
    }

    fn resource_labels(&self) -> &Labels {
        &self.labels
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reconnect_delay() {
        let mut config = GatewayConfig {
            id: "gw-1".to_string(),
            ..Default::default()
        };
        config.apply_defaults();
        assert_eq!(config.reconnect_delay, "15s");
        assert_eq!(config.reconnect_delay().expect("delay"), Duration::from_secs(15));
    }

    #[test]
    fn ack_timeout_respects_minimum() {
        let mut config = GatewayConfig::default();
        assert_eq!(config.ack_timeout(), DEFAULT_ACK_TIMEOUT);
        config
            .provider
            .insert("timeout", serde_json::json!("1ms"));
        assert_eq!(config.ack_timeout(), MIN_ACK_TIMEOUT);
        config
            .provider
            .insert("timeout", serde_json::json!("500ms"));
        assert_eq!(config.ack_timeout(), Duration::from_millis(500));
    }
}
