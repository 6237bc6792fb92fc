use crate::error::ScriptError;
use async_trait::async_trait;
use serde_json::Value;

/// 脚本执行器（外部沙箱的契约）。
#[async_trait]
pub trait ScriptEngine: Send + Sync {
    async fn execute(&self, script: &str, input: &Value) -> Result<Value, ScriptError>;
}

/// 未接入沙箱时的默认实现：返回输入中的 `value`，没有时返回整个输入。
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEngine;

#[async_trait]
impl ScriptEngine for PassthroughEngine {
    async fn execute(&self, _script: &str, input: &Value) -> Result<Value, ScriptError> {
        Ok(input.get("value").cloned().unwrap_or_else(|| input.clone()))
    }
}
