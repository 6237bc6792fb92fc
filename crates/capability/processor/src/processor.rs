use crate::error::ProcessorError;
use domain::{Event, EventType, Message, MessageType, topics};
use mc_bus::{Bus, BusPayload};
use mc_script::{PassthroughEngine, ScriptEngine};
use mc_storage::Stores;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// 规范消息的处理入口。
pub struct MessageProcessor {
    pub(crate) stores: Stores,
    pub(crate) bus: Bus,
    pub(crate) script: Arc<dyn ScriptEngine>,
}

impl MessageProcessor {
    pub fn new(stores: Stores, bus: Bus) -> Self {
        Self {
            stores,
            bus,
            script: Arc::new(PassthroughEngine),
        }
    }

    pub fn with_script_engine(mut self, script: Arc<dyn ScriptEngine>) -> Self {
        self.script = script;
        self
    }

    /// 按消息形态分发。
    pub async fn process(&self, message: &Message) -> Result<(), ProcessorError> {
        debug!(
            target: "mc.processor",
            gateway = %message.gateway_id,
            node = %message.node_id,
            source = %message.source_id,
            msg_type = %message.msg_type,
            payloads = message.payloads.len(),
            "message_processing"
        );
        match (
            message.node_id.is_empty(),
            message.source_id.is_empty(),
            message.msg_type,
        ) {
            (true, _, MessageType::Action) | (false, true, MessageType::Action) => {
                self.forward_action(message)
            }
            (false, false, MessageType::Set) => {
                self.set_field_data(message).await?;
                self.update_source_last_seen(message).await?;
                self.update_node_last_seen(message).await
            }
            (false, false, MessageType::Request) => self.request_field_data(message).await,
            (false, false, MessageType::Presentation) => {
                self.update_source_detail(message).await?;
                self.update_node_last_seen(message).await
            }
            (false, true, MessageType::Set | MessageType::Presentation) => {
                self.update_node_data(message).await
            }
            _ => Err(ProcessorError::Unsupported {
                message_type: message.msg_type.to_string(),
                node_id: message.node_id.clone(),
                source_id: message.source_id.clone(),
            }),
        }
    }

    /// 动作消息原样转发回网关。
    fn forward_action(&self, message: &Message) -> Result<(), ProcessorError> {
        let mut outgoing = message.clone();
        outgoing.is_received = false;
        self.bus
            .publish(&topics::to_provider(&message.gateway_id), &outgoing)?;
        Ok(())
    }

    /// 观察者事件发布失败只记录日志。
    pub(crate) fn publish_event<T: Serialize>(
        &self,
        topic: &str,
        event_type: EventType,
        entity_type: &str,
        entity_id: String,
        entity: &T,
    ) {
        let event = Event::new(event_type, entity_type, entity_id, entity);
        if let Err(err) = self.bus.publish(topic, &event) {
            warn!(target: "mc.processor", topic = %topic, error = %err, "event_publish_failed");
        }
    }

    pub(crate) fn publish<P: BusPayload>(&self, topic: &str, payload: &P) -> Result<(), ProcessorError> {
        self.bus.publish(topic, payload)?;
        Ok(())
    }
}
