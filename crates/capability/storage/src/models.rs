//! 指标数据点。

use chrono::{DateTime, Utc};
use domain::{FieldValue, MetricType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 写入指标库的一个数据点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPoint {
    pub metric_type: MetricType,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp: DateTime<Utc>,
}

impl MetricPoint {
    pub fn new(metric_type: MetricType, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric_type,
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    pub fn with_tag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.tags.insert(key.to_string(), value.into());
        self
    }

    pub fn with_field(mut self, key: &str, value: FieldValue) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}
