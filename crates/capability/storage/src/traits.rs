//! 存储接口 Trait 定义
//!
//! - NodeStore / SourceStore / FieldStore：设备模型实体，按复合键寻址
//! - ResourceStore：网关、处理器、调度等资源配置，按 id 寻址
//! - MetricStore：时序指标写入

use crate::error::StorageError;
use crate::models::MetricPoint;
use async_trait::async_trait;
use domain::{Field, Node, Source};

/// 节点存储接口
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn get_node(&self, gateway_id: &str, node_id: &str)
    -> Result<Option<Node>, StorageError>;

    /// 插入或覆盖
    async fn save_node(&self, node: Node) -> Result<(), StorageError>;

    /// 列出节点，`gateway_id` 为 None 时返回全部
    async fn list_nodes(&self, gateway_id: Option<&str>) -> Result<Vec<Node>, StorageError>;

    async fn delete_node(&self, gateway_id: &str, node_id: &str) -> Result<bool, StorageError>;
}

/// 源存储接口
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn get_source(
        &self,
        gateway_id: &str,
        node_id: &str,
        source_id: &str,
    ) -> Result<Option<Source>, StorageError>;

    async fn save_source(&self, source: Source) -> Result<(), StorageError>;

    async fn list_sources(
        &self,
        gateway_id: &str,
        node_id: &str,
    ) -> Result<Vec<Source>, StorageError>;
}

/// 字段存储接口
#[async_trait]
pub trait FieldStore: Send + Sync {
    async fn get_field(
        &self,
        gateway_id: &str,
        node_id: &str,
        source_id: &str,
        field_id: &str,
    ) -> Result<Option<Field>, StorageError>;

    async fn save_field(&self, field: Field) -> Result<(), StorageError>;

    async fn list_fields(
        &self,
        gateway_id: &str,
        node_id: &str,
        source_id: &str,
    ) -> Result<Vec<Field>, StorageError>;
}

/// 资源配置存储接口
#[async_trait]
pub trait ResourceStore<T>: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<T>, StorageError>;

    async fn list(&self) -> Result<Vec<T>, StorageError>;

    async fn save(&self, item: T) -> Result<(), StorageError>;

    async fn delete(&self, id: &str) -> Result<bool, StorageError>;
}

/// 指标写入接口
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn write(&self, point: MetricPoint) -> Result<(), StorageError>;
}
