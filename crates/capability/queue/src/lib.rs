//! 有界工作队列。
//!
//! - 满即丢弃：`produce` 非阻塞，容量不足或已停止时交给 `on_dropped`
//! - 可选重试：失败项由 worker 本地持有，指数退避（100ms 起，翻倍，上限 `base_delay`）
//! - 动态扩容：`resize` 原子更新容量
//! - 优雅停止：`stop` 幂等，等待 worker 退出后将剩余项交给 `on_dropped`

mod consumer;
mod error;
mod queue;

pub use consumer::{FnConsumer, QueueConsumer, consumer_fn};
pub use error::QueueError;
pub use queue::{BoundedQueue, DropFn, INITIAL_RETRY_DELAY, QueueConfig, RetryPolicy};
