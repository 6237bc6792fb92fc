//! 资源动作事件（start/stop/reload 等）。

use crate::labels::Labels;
use serde::{Deserialize, Serialize};

/// 资源类型：网关。
pub const RESOURCE_GATEWAY: &str = "gateway";
/// 资源类型：通知处理器。
pub const RESOURCE_HANDLER: &str = "handler";
/// 资源类型：任务。
pub const RESOURCE_TASK: &str = "task";
/// 资源类型：调度。
pub const RESOURCE_SCHEDULE: &str = "scheduler";

/// 资源命令。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceCommand {
    Add,
    Start,
    Stop,
    Remove,
    Reload,
    UnloadAll,
    LoadAll,
    Disable,
}

/// 资源事件：`service.<type>` topic 上的载荷。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEvent {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub command: ResourceCommand,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ResourceEvent {
    pub fn new(resource_type: impl Into<String>, command: ResourceCommand) -> Self {
        Self {
            resource_type: resource_type.into(),
            command,
            id: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// 可被服务过滤器识别的资源配置。
pub trait Resource {
    fn resource_id(&self) -> &str;
    /// 过滤用的类型（网关为 provider 类型，处理器为插件类型）。
    fn resource_kind(&self) -> &str;
    fn resource_labels(&self) -> &Labels;
    fn is_enabled(&self) -> bool;
}
