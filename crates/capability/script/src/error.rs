/// 脚本与变量错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("script execution error: {0}")]
    Execution(String),
    #[error("invalid script result: {0}")]
    InvalidResult(String),
    #[error("variable {name} not found: {reference}")]
    VariableNotFound { name: String, reference: String },
    #[error("invalid variable reference: {0}")]
    InvalidReference(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<mc_storage::StorageError> for ScriptError {
    fn from(err: mc_storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
