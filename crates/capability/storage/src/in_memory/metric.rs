//! 指标内存实现

use crate::error::StorageError;
use crate::models::MetricPoint;
use crate::traits::MetricStore;
use std::sync::RwLock;

/// 保留全部数据点，供测试断言。
pub struct InMemoryMetricStore {
    points: RwLock<Vec<MetricPoint>>,
}

impl InMemoryMetricStore {
    pub fn new() -> Self {
        Self {
            points: RwLock::new(Vec::new()),
        }
    }

    pub fn points(&self) -> Vec<MetricPoint> {
        self.points
            .read()
            .map(|points| points.clone())
            .unwrap_or_default()
    }

    /// 指定 tag 匹配的数据点。
    pub fn points_tagged(&self, key: &str, value: &str) -> Vec<MetricPoint> {
        self.points()
            .into_iter()
            .filter(|point| point.tags.get(key).map(String::as_str) == Some(value))
            .collect()
    }
}

impl Default for InMemoryMetricStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MetricStore for InMemoryMetricStore {
    async fn write(&self, point: MetricPoint) -> Result<(), StorageError> {
        let mut points = self
            .points
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        points.push(point);
        Ok(())
    }
}

/// 丢弃全部写入。
pub struct NoopMetricStore;

#[async_trait::async_trait]
impl MetricStore for NoopMetricStore {
    async fn write(&self, _point: MetricPoint) -> Result<(), StorageError> {
        Ok(())
    }
}
