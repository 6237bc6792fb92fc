use crate::data::BusData;
use crate::error::BusError;
use std::sync::Arc;

/// 订阅 ID，进程内单调递增，不复用。
pub type SubscriptionId = u64;

/// 订阅回调。
pub type BusHandler = Arc<dyn Fn(BusData) + Send + Sync>;

/// 总线后端。
pub trait BusBackend: Send + Sync {
    /// 投递到订阅者的发送队列后即返回，不等待处理完成。
    fn publish(&self, data: BusData) -> Result<(), BusError>;
    fn subscribe(&self, topic: &str, handler: BusHandler) -> Result<SubscriptionId, BusError>;
    fn queue_subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: BusHandler,
    ) -> Result<SubscriptionId, BusError>;
    fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> Result<(), BusError>;
    fn unsubscribe_all(&self, topic: &str) -> Result<(), BusError>;
    fn close(&self) -> Result<(), BusError>;
}
