//! 规范设备模型：网关 → 节点 → 源 → 字段。

use crate::labels::{Labels, Others};
use crate::metric::{FieldValue, MetricType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 资源状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusType {
    Up,
    Down,
    Unavailable,
    Error,
    #[default]
    Unknown,
}

/// 状态 + 描述 + 变更时间。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(default)]
    pub status: StatusType,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

impl State {
    pub fn new(status: StatusType, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            since: Some(Utc::now()),
        }
    }
}

/// 节点：网关下的逻辑设备。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub gateway_id: String,
    pub node_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub others: Others,
    #[serde(default)]
    pub state: State,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Node {
    pub fn new(gateway_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        let node_id = node_id.into();
        Self {
            gateway_id: gateway_id.into(),
            name: node_id.clone(),
            node_id,
            ..Default::default()
        }
    }

    pub fn key(&self) -> String {
        node_key(&self.gateway_id, &self.node_id)
    }
}

/// 源：节点下的子设备（如板载传感器）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub gateway_id: String,
    pub node_id: String,
    pub source_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub others: Others,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Source {
    pub fn new(
        gateway_id: impl Into<String>,
        node_id: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        let source_id = source_id.into();
        Self {
            gateway_id: gateway_id.into(),
            node_id: node_id.into(),
            name: source_id.clone(),
            source_id,
            ..Default::default()
        }
    }

    pub fn key(&self) -> String {
        source_key(&self.gateway_id, &self.node_id, &self.source_id)
    }
}

/// 字段的某一时刻取值。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldState {
    #[serde(default)]
    pub value: Option<FieldValue>,
    #[serde(default)]
    pub is_received: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl FieldState {
    /// 值的字符串形式；无值时为空串。
    pub fn string_value(&self) -> String {
        self.value
            .as_ref()
            .map(|value| value.to_string())
            .unwrap_or_default()
    }

    pub fn json_value(&self) -> serde_json::Value {
        self.value
            .as_ref()
            .map(FieldValue::to_json)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// 字段格式化脚本。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formatter {
    #[serde(default)]
    pub on_receive: String,
}

/// 字段：源下可寻址的测量值或执行器。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub gateway_id: String,
    pub node_id: String,
    pub source_id: String,
    pub field_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metric_type: MetricType,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub others: Others,
    #[serde(default)]
    pub current: FieldState,
    #[serde(default)]
    pub previous: FieldState,
    #[serde(default)]
    pub no_change_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub formatter: Formatter,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Field {
    pub fn new(
        gateway_id: impl Into<String>,
        node_id: impl Into<String>,
        source_id: impl Into<String>,
        field_id: impl Into<String>,
    ) -> Self {
        let field_id = field_id.into();
        Self {
            gateway_id: gateway_id.into(),
            node_id: node_id.into(),
            source_id: source_id.into(),
            name: field_id.clone(),
            field_id,
            ..Default::default()
        }
    }

    pub fn key(&self) -> String {
        field_key(
            &self.gateway_id,
            &self.node_id,
            &self.source_id,
            &self.field_id,
        )
    }

    /// 写入新值：current → previous，字符串形式变化时刷新 `no_change_since`。
    pub fn shift_value(&mut self, value: FieldValue, is_received: bool, timestamp: DateTime<Utc>) {
        let timestamp = match self.current.timestamp {
            Some(previous) if previous > timestamp => previous,
            _ => timestamp,
        };
        self.previous = std::mem::take(&mut self.current);
        self.current = FieldState {
            value: Some(value),
            is_received,
            timestamp: Some(timestamp),
        };
        if self.current.string_value() != self.previous.string_value()
            || self.no_change_since.is_none()
        {
            self.no_change_since = Some(timestamp);
        }
    }

    /// 当前值与上一个值的字符串形式是否不同；首次写入视为变化。
    pub fn is_changed(&self) -> bool {
        match (&self.current.value, &self.previous.value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(current), Some(previous)) => current.to_string() != previous.to_string(),
        }
    }
}

pub fn node_key(gateway_id: &str, node_id: &str) -> String {
    format!("{gateway_id}.{node_id}")
}

pub fn source_key(gateway_id: &str, node_id: &str, source_id: &str) -> String {
    format!("{gateway_id}.{node_id}.{source_id}")
}

pub fn field_key(gateway_id: &str, node_id: &str, source_id: &str, field_id: &str) -> String {
    format!("{gateway_id}.{node_id}.{source_id}.{field_id}")
}
