//! 观察者事件（`event.*` topic）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Create,
    Update,
    Delete,
    Set,
    Request,
}

/// 实体变更事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default)]
    pub entity: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new<T: Serialize>(
        event_type: EventType,
        entity_type: &str,
        entity_id: impl Into<String>,
        entity: &T,
    ) -> Self {
        Self {
            event_type,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.into(),
            entity: serde_json::to_value(entity).unwrap_or(serde_json::Value::Null),
            timestamp: Utc::now(),
        }
    }
}
