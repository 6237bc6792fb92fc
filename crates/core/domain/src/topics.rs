//! 总线 topic 常量（前缀由总线统一追加）。

/// provider → 处理器。
pub const MESSAGE_TO_SERVER: &str = "message.to_server";
/// 处理器/用户 → provider 的 topic 前缀。
pub const MESSAGE_TO_PROVIDER: &str = "message.to_provider";
/// provider 级 ACK 的 topic 前缀。
pub const MESSAGE_RAW_ACK: &str = "message.raw_message_acknowledgement";
/// 处理器分发入口。
pub const MESSAGE_NOTIFY_HANDLER: &str = "message.notify_handler";

pub const SERVICE_GATEWAY: &str = "service.gateway";
pub const SERVICE_NOTIFY_HANDLER: &str = "service.notify_handler";
pub const SERVICE_SCHEDULER: &str = "service.scheduler";
pub const SERVICE_TASK: &str = "service.task";
pub const SERVICE_RESOURCE_SERVER: &str = "service.resource_server";

pub const EVENT_GATEWAY: &str = "event.gateway";
pub const EVENT_NODE: &str = "event.node";
pub const EVENT_SOURCE: &str = "event.source";
pub const EVENT_FIELD_SET: &str = "event.field.set";
pub const EVENT_FIELD_REQUEST: &str = "event.field.request";
pub const EVENT_HANDLER: &str = "event.handler";
pub const EVENT_SCHEDULE: &str = "event.schedule";

/// `message.to_provider.<gatewayID>`
pub fn to_provider(gateway_id: &str) -> String {
    format!("{MESSAGE_TO_PROVIDER}.{gateway_id}")
}

/// `message.raw_message_acknowledgement.<gatewayID>.<msgID>`
pub fn raw_ack(gateway_id: &str, msg_id: &str) -> String {
    format!("{MESSAGE_RAW_ACK}.{gateway_id}.{msg_id}")
}

/// 资源类型对应的服务 topic。
pub fn service_topic(resource_type: &str) -> String {
    match resource_type {
        crate::resource::RESOURCE_GATEWAY => SERVICE_GATEWAY.to_string(),
        crate::resource::RESOURCE_HANDLER => SERVICE_NOTIFY_HANDLER.to_string(),
        crate::resource::RESOURCE_SCHEDULE => SERVICE_SCHEDULER.to_string(),
        crate::resource::RESOURCE_TASK => SERVICE_TASK.to_string(),
        other => format!("service.{other}"),
    }
}
