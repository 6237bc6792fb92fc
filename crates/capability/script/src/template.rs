//! `{{ name }}` / `{{ a.b.c }}` 占位符替换。

use serde_json::Value;
use std::collections::BTreeMap;

/// 渲染模板，未知变量替换为空串，未闭合的占位符原样保留。
pub fn render(template: &str, variables: &Value) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            output.push_str(&rest[start..]);
            return output;
        };
        let path = after[..end].trim().trim_start_matches('.');
        if let Some(value) = lookup_path(variables, path) {
            output.push_str(&value_to_text(value));
        }
        rest = &after[end + 2..];
    }
    output.push_str(rest);
    output
}

/// 渲染一组参数。
pub fn render_map(
    templates: &BTreeMap<String, String>,
    variables: &Value,
) -> BTreeMap<String, String> {
    templates
        .iter()
        .map(|(key, template)| (key.clone(), render(template, variables)))
        .collect()
}

/// 按点分路径取值，数组下标用数字。
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

/// 字符串不带引号，null 为空串，其余为 JSON 文本。
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
