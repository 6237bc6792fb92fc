use domain::{Event, GatewayConfig, HandlerConfig, HandlerMessage, Message, ResourceEvent, ScheduleConfig, State};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// 允许在总线上传输的载荷类型。
///
/// `TYPE_NAME` 写入 [`crate::BusData`]，解码时校验，防止同一 topic 上混入其它类型。
pub trait BusPayload: Serialize + DeserializeOwned + Send + 'static {
    const TYPE_NAME: &'static str;
}

impl BusPayload for Message {
    const TYPE_NAME: &'static str = "message";
}

impl BusPayload for ResourceEvent {
    const TYPE_NAME: &'static str = "resource_event";
}

impl BusPayload for Event {
    const TYPE_NAME: &'static str = "event";
}

impl BusPayload for HandlerMessage {
    const TYPE_NAME: &'static str = "handler_message";
}

impl BusPayload for GatewayConfig {
    const TYPE_NAME: &'static str = "gateway_config";
}

impl BusPayload for HandlerConfig {
    const TYPE_NAME: &'static str = "handler_config";
}

impl BusPayload for ScheduleConfig {
    const TYPE_NAME: &'static str = "schedule_config";
}

impl BusPayload for State {
    const TYPE_NAME: &'static str = "state";
}

impl BusPayload for String {
    const TYPE_NAME: &'static str = "string";
}

impl BusPayload for serde_json::Value {
    const TYPE_NAME: &'static str = "json";
}
