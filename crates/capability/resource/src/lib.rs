//! 资源动作分发：串行处理 `service.<type>` 上的 start/stop/reload 等事件。

mod dispatch;
mod error;
mod listener;
mod manager;

pub use dispatch::handle_event;
pub use error::ResourceError;
pub use listener::ServiceListener;
pub use manager::ResourceManager;
