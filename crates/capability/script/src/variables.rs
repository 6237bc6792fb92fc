//! 调度 / 任务变量加载。

use crate::error::ScriptError;
use mc_storage::Stores;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 字段引用：`field:<gw>.<node>.<source>.<field>`。
pub const FIELD_PREFIX: &str = "field:";
/// 节点引用：`node:<gw>.<node>`。
pub const NODE_PREFIX: &str = "node:";

/// 解析变量定义；引用类从存储加载实体，其它值作为字面量。
pub async fn load_variables(
    stores: &Stores,
    definitions: &BTreeMap<String, String>,
) -> Result<Map<String, Value>, ScriptError> {
    let mut variables = Map::new();
    for (name, definition) in definitions {
        let value = resolve(stores, name, definition.trim()).await?;
        variables.insert(name.clone(), value);
    }
    Ok(variables)
}

async fn resolve(stores: &Stores, name: &str, definition: &str) -> Result<Value, ScriptError> {
    let not_found = || ScriptError::VariableNotFound {
        name: name.to_string(),
        reference: definition.to_string(),
    };

    if let Some(reference) = definition.strip_prefix(FIELD_PREFIX) {
        let parts = split_reference(reference, 4)?;
        let field = stores
            .fields
            .get_field(parts[0], parts[1], parts[2], parts[3])
            .await?
            .ok_or_else(not_found)?;
        return serde_json::to_value(field).map_err(|err| ScriptError::InvalidResult(err.to_string()));
    }
    if let Some(reference) = definition.strip_prefix(NODE_PREFIX) {
        let parts = split_reference(reference, 2)?;
        let node = stores
            .nodes
            .get_node(parts[0], parts[1])
            .await?
            .ok_or_else(not_found)?;
        return serde_json::to_value(node).map_err(|err| ScriptError::InvalidResult(err.to_string()));
    }
    Ok(Value::String(definition.to_string()))
}

fn split_reference(reference: &str, expected: usize) -> Result<Vec<&str>, ScriptError> {
    let parts: Vec<&str> = reference.trim().split('.').collect();
    if parts.len() != expected || parts.iter().any(|part| part.is_empty()) {
        return Err(ScriptError::InvalidReference(reference.to_string()));
    }
    Ok(parts)
}
