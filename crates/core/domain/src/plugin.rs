//! 插件配置块：自由结构的 map，由 `type` 选择已注册的插件。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 插件配置。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginConfig(pub BTreeMap<String, serde_json::Value>);

impl PluginConfig {
    /// 插件类型（`type` 键）。
    pub fn plugin_type(&self) -> &str {
        self.get_str("type").unwrap_or("")
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    /// 解码为插件自有的强类型配置。
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .0
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map))
    }

    pub fn with_type(plugin_type: &str) -> Self {
        let mut config = Self::default();
        config.insert("type", serde_json::Value::String(plugin_type.to_string()));
        config
    }
}
