//! 内存存储实现模块
//!
//! 用于测试与单机运行。
//!
//! - NodeStore / SourceStore / FieldStore: InMemoryNodeStore 等
//! - ResourceStore: InMemoryResourceStore
//! - MetricStore: InMemoryMetricStore（保留数据点）、NoopMetricStore（丢弃）

mod entity;
mod metric;
mod resource;
mod table;

pub use entity::*;
pub use metric::*;
pub use resource::*;
