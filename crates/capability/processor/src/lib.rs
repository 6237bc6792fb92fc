//! 网关消息处理器：`message.to_server` → 节点/源/字段更新 + 指标写入。
//!
//! 所有实体写入都经由单 worker 队列串行执行，同一字段的 current/previous 不会交错。

mod error;
mod field;
mod metric;
mod node;
mod processor;
mod service;

pub use error::ProcessorError;
pub use processor::MessageProcessor;
pub use service::{PROCESSOR_QUEUE_CAPACITY, ProcessorService};
