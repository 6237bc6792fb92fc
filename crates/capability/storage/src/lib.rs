//! # MC Storage 模块
//!
//! 存储与指标写入的抽象层。具体数据库属于外部插件，这里只定义契约并提供内存实现。
//!
//! ## 模块说明
//!
//! - [`traits`]：实体存储（节点/源/字段）、资源配置存储、指标写入接口
//! - [`models`]：指标数据点
//! - [`error`]：存储错误类型
//! - [`in_memory`]：`RwLock<HashMap>` 内存实现，用于测试与单机运行
//!
//! ## 约定
//!
//! - 查询不存在的记录返回 `Ok(None)`，错误只用于真正的 I/O 故障
//! - 实体的写入只经由消息处理器的单 worker 队列，存储层不做行级加锁

pub mod error;
pub mod in_memory;
pub mod models;
pub mod traits;

pub use error::*;
pub use in_memory::{
    InMemoryFieldStore, InMemoryMetricStore, InMemoryNodeStore, InMemoryResourceStore,
    InMemorySourceStore, NoopMetricStore,
};
pub use models::*;
pub use traits::*;

use domain::{GatewayConfig, HandlerConfig, PluginConfig, ScheduleConfig};
use std::sync::Arc;
use tracing::info;

/// 内存存储插件类型。
pub const STORAGE_MEMORY: &str = "memory";
/// 丢弃型指标插件类型。
pub const METRIC_NOOP: &str = "noop";

/// 各存储接口的集合，由初始化流程构造后注入各服务。
#[derive(Clone)]
pub struct Stores {
    pub nodes: Arc<dyn NodeStore>,
    pub sources: Arc<dyn SourceStore>,
    pub fields: Arc<dyn FieldStore>,
    pub gateways: Arc<dyn ResourceStore<GatewayConfig>>,
    pub handlers: Arc<dyn ResourceStore<HandlerConfig>>,
    pub schedules: Arc<dyn ResourceStore<ScheduleConfig>>,
    pub metrics: Arc<dyn MetricStore>,
}

impl Stores {
    /// 全内存实现，指标写入被丢弃。
    pub fn in_memory() -> Self {
        Self {
            nodes: Arc::new(InMemoryNodeStore::new()),
            sources: Arc::new(InMemorySourceStore::new()),
            fields: Arc::new(InMemoryFieldStore::new()),
            gateways: Arc::new(InMemoryResourceStore::<GatewayConfig>::new()),
            handlers: Arc::new(InMemoryResourceStore::<HandlerConfig>::new()),
            schedules: Arc::new(InMemoryResourceStore::<ScheduleConfig>::new()),
            metrics: Arc::new(NoopMetricStore),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricStore>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// 按配置初始化存储与指标插件。
pub fn init_stores(storage: &PluginConfig, metric: &PluginConfig) -> Result<Stores, StorageError> {
    let storage_type = normalized_type(storage, STORAGE_MEMORY);
    if storage_type != STORAGE_MEMORY {
        return Err(StorageError::new(format!(
            "unsupported storage plugin: {storage_type}"
        )));
    }
    let metric_type = normalized_type(metric, METRIC_NOOP);
    let metrics: Arc<dyn MetricStore> = match metric_type.as_str() {
        METRIC_NOOP => Arc::new(NoopMetricStore),
        STORAGE_MEMORY => Arc::new(InMemoryMetricStore::new()),
        other => {
            return Err(StorageError::new(format!(
                "unsupported metric plugin: {other}"
            )));
        }
    };
    info!(
        target: "mc.storage",
        storage = %storage_type,
        metric = %metric_type,
        "storage_initialized"
    );
    Ok(Stores::in_memory().with_metrics(metrics))
}

fn normalized_type(config: &PluginConfig, default: &str) -> String {
    let plugin_type = config.plugin_type().trim().to_ascii_lowercase();
    if plugin_type.is_empty() {
        default.to_string()
    } else {
        plugin_type
    }
}
