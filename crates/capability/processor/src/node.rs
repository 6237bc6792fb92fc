use crate::error::ProcessorError;
use crate::processor::MessageProcessor;
use domain::labels::{is_ignored, merge_labels, merge_others};
use domain::{EventType, Message, MetricType, Node, Source, State, StatusType, topics};
use serde_json::Value;

const KEY_NAME: &str = "name";
const KEY_BATTERY_LEVEL: &str = "batteryLevel";

impl MessageProcessor {
    /// 节点级 set / presentation：名称、电量与扩展属性。
    pub(crate) async fn update_node_data(&self, message: &Message) -> Result<(), ProcessorError> {
        let (mut node, created) = self.load_node(message).await?;
        for payload in &message.payloads {
            merge_labels(&mut node.labels, &payload.labels);
            merge_others(&mut node.others, &node.labels, &payload.others);
            match payload.key.as_str() {
                KEY_NAME => {
                    if !is_ignored(&node.labels, KEY_NAME) && !payload.value.trim().is_empty() {
                        node.name = payload.value.trim().to_string();
                    }
                }
                KEY_BATTERY_LEVEL => {
                    let level = MetricType::GaugeFloat.convert(&Value::String(payload.value.clone()))?;
                    if !is_ignored(&node.labels, KEY_BATTERY_LEVEL) {
                        node.others
                            .insert(KEY_BATTERY_LEVEL.to_string(), level.to_json());
                    }
                    if let domain::FieldValue::F64(level) = level {
                        self.write_battery_metric(&node, level, message.timestamp)
                            .await?;
                    }
                }
                key => {
                    if !is_ignored(&node.labels, key) {
                        node.others
                            .insert(key.to_string(), Value::String(payload.value.clone()));
                    }
                }
            }
        }
        mark_seen(&mut node, message);
        self.save_node(node, created).await
    }

    /// 源级 presentation。
    pub(crate) async fn update_source_detail(&self, message: &Message) -> Result<(), ProcessorError> {
        let (mut source, created) = self.load_source(message).await?;
        for payload in &message.payloads {
            merge_labels(&mut source.labels, &payload.labels);
            merge_others(&mut source.others, &source.labels, &payload.others);
            match payload.key.as_str() {
                KEY_NAME => {
                    if !is_ignored(&source.labels, KEY_NAME) && !payload.value.trim().is_empty() {
                        source.name = payload.value.trim().to_string();
                    }
                }
                key => {
                    if !is_ignored(&source.labels, key) {
                        source
                            .others
                            .insert(key.to_string(), Value::String(payload.value.clone()));
                    }
                }
            }
        }
        source.last_seen = Some(message.timestamp);
        self.save_source(source, created).await
    }

    pub(crate) async fn update_node_last_seen(&self, message: &Message) -> Result<(), ProcessorError> {
        let (mut node, created) = self.load_node(message).await?;
        mark_seen(&mut node, message);
        self.save_node(node, created).await
    }

    pub(crate) async fn update_source_last_seen(
        &self,
        message: &Message,
    ) -> Result<(), ProcessorError> {
        let (mut source, created) = self.load_source(message).await?;
        source.last_seen = Some(message.timestamp);
        self.save_source(source, created).await
    }

    async fn load_node(&self, message: &Message) -> Result<(Node, bool), ProcessorError> {
        let node = self
            .stores
            .nodes
            .get_node(&message.gateway_id, &message.node_id)
            .await?;
        Ok(match node {
            Some(node) => (node, false),
            None => (Node::new(&message.gateway_id, &message.node_id), true),
        })
    }

    async fn save_node(&self, node: Node, created: bool) -> Result<(), ProcessorError> {
        self.stores.nodes.save_node(node.clone()).await?;
        let event_type = if created {
            EventType::Create
        } else {
            EventType::Update
        };
        self.publish_event(topics::EVENT_NODE, event_type, "node", node.key(), &node);
        Ok(())
    }

    async fn load_source(&self, message: &Message) -> Result<(Source, bool), ProcessorError> {
        let source = self
            .stores
            .sources
            .get_source(&message.gateway_id, &message.node_id, &message.source_id)
            .await?;
        Ok(match source {
            Some(source) => (source, false),
            None => (
                Source::new(&message.gateway_id, &message.node_id, &message.source_id),
                true,
            ),
        })
    }

    async fn save_source(&self, source: Source, created: bool) -> Result<(), ProcessorError> {
        self.stores.sources.save_source(source.clone()).await?;
        let event_type = if created {
            EventType::Create
        } else {
            EventType::Update
        };
        self.publish_event(topics::EVENT_SOURCE, event_type, "source", source.key(), &source);
        Ok(())
    }
}

/// 刷新最后在线时间；状态非 up 时切到 up。
fn mark_seen(node: &mut Node, message: &Message) {
    let last_seen = match node.last_seen {
        Some(previous) if previous > message.timestamp => previous,
        _ => message.timestamp,
    };
    node.last_seen = Some(last_seen);
    if node.state.status != StatusType::Up {
        node.state = State::new(StatusType::Up, "");
    }
}
