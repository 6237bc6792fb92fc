use crate::error::HandlerError;
use async_trait::async_trait;
use domain::State;
use std::collections::BTreeMap;

/// 渲染后的处理器参数。
pub type HandlerData = BTreeMap<String, String>;

/// 通知处理器。
///
/// 参数的结构由实现自行解释，通常是 `{type, disabled, data}` 信封。
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self) -> Result<(), HandlerError>;

    async fn close(&self) -> Result<(), HandlerError>;

    async fn post(&self, data: &HandlerData) -> Result<(), HandlerError>;

    /// 处理器自报的状态；返回 `None` 时以服务记录的分发结果为准。
    fn state(&self) -> Option<State> {
        None
    }
}
