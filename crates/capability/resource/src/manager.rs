use crate::error::ResourceError;
use async_trait::async_trait;

/// 可被资源事件驱动的服务（网关、处理器、调度）。
#[async_trait]
pub trait ResourceManager<C>: Send + Sync {
    /// 资源类型，如 `gateway`。
    fn resource_type(&self) -> &str;

    /// 存储中的全部配置。
    async fn list_configs(&self) -> Result<Vec<C>, ResourceError>;

    async fn get_config(&self, id: &str) -> Result<Option<C>, ResourceError>;

    /// 加载（已加载时先卸载再加载）。
    async fn load(&self, config: C) -> Result<(), ResourceError>;

    /// 卸载；未加载时返回 Ok。
    async fn unload(&self, id: &str) -> Result<(), ResourceError>;

    fn loaded_ids(&self) -> Vec<String>;

    /// 持久化 `enabled = false` 并卸载。
    async fn disable(&self, id: &str) -> Result<(), ResourceError>;
}
