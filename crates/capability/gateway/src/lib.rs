//! 网关服务：将 Provider 插件桥接到总线。
//!
//! - [`GatewayService`]：单个网关的生命周期、消息队列与原始消息队列
//! - [`SleepingQueue`]：休眠节点待发消息缓存，唤醒时按序下发
//! - [`Provider`] / [`ProviderRegistry`]：设备协议适配器契约与注册表
//! - [`AckWaiter`]：基于一次性订阅的 ACK 关联
//! - [`GatewayManager`]：按资源事件加载/卸载网关

mod ack;
mod error;
mod manager;
mod provider;
mod service;
mod sleeping;
mod virtual_provider;

pub use ack::{AckWaiter, publish_ack, wait_for_ack};
pub use error::GatewayError;
pub use manager::GatewayManager;
pub use provider::{Provider, ProviderContext, ProviderFactory, ProviderRegistry, RawSink};
pub use service::{
    GatewayService, LifecycleState, MESSAGE_QUEUE_CAPACITY, RAW_QUEUE_CAPACITY, job_prefix,
};
pub use sleeping::{SLEEPING_QUEUE_PER_NODE_LIMIT, SleepingQueue};
pub use virtual_provider::{PROVIDER_VIRTUAL, VirtualProvider};
