//! 通知处理器：按 ID 分发 `message.notify_handler` 上的消息。
//!
//! 处理器本身只负责投递；执行耗时与错误由 [`HandlerService`] 记录为处理器状态，
//! 并发布到 `event.handler`。

mod error;
mod handler;
mod noop;
mod registry;
mod resource;
mod service;

pub use error::HandlerError;
pub use handler::{Handler, HandlerData};
pub use noop::{HANDLER_NOOP, NoopHandler};
pub use registry::{HandlerContext, HandlerFactory, HandlerRegistry};
pub use resource::{DelayedAction, HANDLER_RESOURCE, ResourceHandler, persistence_path};
pub use service::{HANDLER_QUEUE_CAPACITY, HandlerService};
