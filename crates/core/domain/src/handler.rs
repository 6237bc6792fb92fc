//! 通知处理器配置与载荷。

use crate::labels::Labels;
use crate::model::State;
use crate::plugin::PluginConfig;
use crate::resource::{Resource, ResourceCommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 处理器信封中的资源类数据。
pub const DATA_TYPE_RESOURCE: &str = "resource";

/// 处理器配置。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerConfig {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub spec: PluginConfig,
    #[serde(default)]
    pub state: State,
}

impl HandlerConfig {
    pub fn handler_type(&self) -> &str {
        self.spec.plugin_type()
    }
}

impl Resource for HandlerConfig {
    fn resource_id(&self) -> &str {
        &self.id
    }

    fn resource_kind(&self) -> &str {
        self.handler_type()
    }

    fn resource_labels(&self) -> &Labels {
        &self.labels
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// `message.notify_handler` 上的消息：处理器 ID + 渲染后的参数。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerMessage {
    pub id: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// 参数值的信封：`{type, disabled, data}`，data 为 base64 编码的 YAML。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerPayload {
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub data: String,
}

/// 资源处理器解码后的数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceData {
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: String,
    pub command: ResourceCommand,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// 延迟执行（如 `5m`），空串立即执行。
    #[serde(default)]
    pub pre_delay: String,
}
