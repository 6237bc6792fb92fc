//! 与协议无关的消息模型。

use crate::labels::{Labels, Others};
use crate::metric::MetricType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 唤醒动作：休眠节点上线时触发缓存消息下发。
pub const ACTION_AWAKE: &str = "awake";
/// 刷新节点信息动作。
pub const ACTION_REFRESH_NODE_INFO: &str = "refresh_node_info";
/// 重启节点动作。
pub const ACTION_REBOOT: &str = "reboot";

/// 消息类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Set,
    Request,
    Presentation,
    Action,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Set => "set",
            MessageType::Request => "request",
            MessageType::Presentation => "presentation",
            MessageType::Action => "action",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 消息载荷。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub metric_type: MetricType,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub others: Others,
}

impl Payload {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_metric_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }
}

/// 规范化消息（provider ↔ 服务端）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// 消息 ID（ACK 关联用，可为空）。
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub gateway_id: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_ack: bool,
    #[serde(default)]
    pub is_received: bool,
    #[serde(default)]
    pub is_sleep_node: bool,
    #[serde(default)]
    pub payloads: Vec<Payload>,
}

impl Message {
    pub fn new(
        gateway_id: impl Into<String>,
        node_id: impl Into<String>,
        source_id: impl Into<String>,
        msg_type: MessageType,
    ) -> Self {
        Self {
            id: String::new(),
            gateway_id: gateway_id.into(),
            node_id: node_id.into(),
            source_id: source_id.into(),
            msg_type,
            timestamp: Utc::now(),
            is_ack: false,
            is_received: false,
            is_sleep_node: false,
            payloads: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payloads.push(payload);
        self
    }

    pub fn first_payload(&self) -> Option<&Payload> {
        self.payloads.first()
    }

    /// 是否为唤醒动作。
    pub fn is_awake(&self) -> bool {
        self.msg_type == MessageType::Action
            && self
                .first_payload()
                .map(|payload| payload.key == ACTION_AWAKE)
                .unwrap_or(false)
    }

    /// 逻辑 ID：(网关, 节点, 源, 类型, 首个载荷 key) 的稳定哈希，用于休眠队列去重。
    pub fn logical_id(&self) -> String {
        let key = self
            .first_payload()
            .map(|payload| payload.key.as_str())
            .unwrap_or("");
        let name = format!(
            "message:{}:{}:{}:{}:{}",
            self.gateway_id,
            self.node_id,
            self.source_id,
            self.msg_type.as_str(),
            key
        );
        uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
    }
}

/// provider 收到的原始帧，不离开网关服务。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub is_received: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub others: Others,
}

impl RawMessage {
    pub fn received(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: String::new(),
            data: data.into(),
            is_received: true,
            timestamp: Utc::now(),
            others: Others::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_id_depends_on_routing_fields_only() {
        let first = Message::new("gw-1", "5", "1", MessageType::Set)
            .with_payload(Payload::new("V_STATUS", "1"));
        let second = Message::new("gw-1", "5", "1", MessageType::Set)
            .with_payload(Payload::new("V_STATUS", "0"));
        let other = Message::new("gw-1", "5", "2", MessageType::Set)
            .with_payload(Payload::new("V_STATUS", "1"));
        assert_eq!(first.logical_id(), second.logical_id());
        assert_ne!(first.logical_id(), other.logical_id());
    }

    #[test]
    fn awake_detection() {
        let awake = Message::new("gw-1", "5", "", MessageType::Action)
            .with_payload(Payload::new(ACTION_AWAKE, ""));
        let reboot = Message::new("gw-1", "5", "", MessageType::Action)
            .with_payload(Payload::new(ACTION_REBOOT, ""));
        assert!(awake.is_awake());
        assert!(!reboot.is_awake());
    }
}
