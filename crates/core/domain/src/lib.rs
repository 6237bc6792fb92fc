//! MyController 核心领域模型。
//!
//! 规范设备模型（网关 → 节点 → 源 → 字段）、与协议无关的消息、
//! 调度配置、资源事件以及总线 topic 常量。所有能力模块共享本 crate。

pub mod duration;
pub mod error;
pub mod event;
pub mod filter;
pub mod gateway;
pub mod handler;
pub mod labels;
pub mod message;
pub mod metric;
pub mod model;
pub mod plugin;
pub mod resource;
pub mod schedule;
pub mod topics;

pub use duration::{parse_duration, parse_duration_or, parse_signed_duration};
pub use error::DomainError;
pub use event::{Event, EventType};
pub use filter::ServiceFilter;
pub use gateway::GatewayConfig;
pub use handler::{HandlerConfig, HandlerMessage, HandlerPayload, ResourceData};
pub use labels::{Labels, Others};
pub use message::{Message, MessageType, Payload, RawMessage};
pub use metric::{FieldValue, GeoValue, MetricType};
pub use model::{Field, FieldState, Formatter, Node, Source, State, StatusType};
pub use plugin::PluginConfig;
pub use resource::{Resource, ResourceCommand, ResourceEvent};
pub use schedule::{
    CustomVariable, Frequency, GeoLocation, ScheduleConfig, ScheduleSpec, ScheduleState,
    ScheduleType, Validity, WebhookConfig,
};
