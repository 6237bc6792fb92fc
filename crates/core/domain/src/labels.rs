//! 标签与扩展属性（labels / others）。
//!
//! 标签 `ignore_<key>=true` 阻止对同名 key 的覆盖（labels 与 others 均适用），
//! 也用于保护 `name`、`metricType`、`unit` 等字段。

use std::collections::BTreeMap;

/// 用户标签。
pub type Labels = BTreeMap<String, String>;

/// 开放的扩展属性。
pub type Others = BTreeMap<String, serde_json::Value>;

/// 忽略标签前缀。
pub const IGNORE_PREFIX: &str = "ignore_";

/// 宽松布尔解析（true/1/yes/on/y）。
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "y"
    )
}

/// 判断 key 是否被 `ignore_<key>` 标签保护。
pub fn is_ignored(labels: &Labels, key: &str) -> bool {
    labels
        .get(&format!("{IGNORE_PREFIX}{key}"))
        .map(|value| parse_bool(value))
        .unwrap_or(false)
}

/// 合并标签；已被保护的 key 保持原值。
pub fn merge_labels(target: &mut Labels, incoming: &Labels) {
    for (key, value) in incoming {
        if is_ignored(target, key) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// 合并扩展属性；保护规则取自 `guard` 标签。
pub fn merge_others(target: &mut Others, guard: &Labels, incoming: &Others) {
    for (key, value) in incoming {
        if is_ignored(guard, key) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_label_blocks_overwrite() {
        let mut labels = Labels::new();
        labels.insert("room".to_string(), "kitchen".to_string());
        labels.insert("ignore_room".to_string(), "true".to_string());
        let mut incoming = Labels::new();
        incoming.insert("room".to_string(), "garage".to_string());
        incoming.insert("floor".to_string(), "1".to_string());

        merge_labels(&mut labels, &incoming);
        assert_eq!(labels.get("room").map(String::as_str), Some("kitchen"));
        assert_eq!(labels.get("floor").map(String::as_str), Some("1"));
    }

    #[test]
    fn others_use_guard_labels() {
        let mut guard = Labels::new();
        guard.insert("ignore_debounce".to_string(), "yes".to_string());
        let mut others = Others::new();
        let mut incoming = Others::new();
        incoming.insert("debounce".to_string(), serde_json::json!("5"));
        incoming.insert("mode".to_string(), serde_json::json!("auto"));

        merge_others(&mut others, &guard, &incoming);
        assert!(!others.contains_key("debounce"));
        assert_eq!(others.get("mode"), Some(&serde_json::json!("auto")));
    }
}
