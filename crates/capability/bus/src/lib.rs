//! 进程内发布/订阅总线。
//!
//! 载荷在发布时一次性编码为 [`BusData`]，订阅者按 topic 精确匹配接收；
//! 队列组订阅中每条消息只投递给组内一个成员。

mod backend;
mod bus;
mod data;
mod embedded;
mod error;
mod payload;

pub use backend::{BusBackend, BusHandler, SubscriptionId};
pub use bus::{BACKEND_EMBEDDED, BACKEND_NATSIO, Bus, BusOptions};
pub use data::BusData;
pub use embedded::EmbeddedBackend;
pub use error::BusError;
pub use payload::BusPayload;
