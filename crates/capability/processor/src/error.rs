use domain::DomainError;
use mc_bus::BusError;
use mc_script::ScriptError;

/// 消息处理错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessorError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("conversion error: {0}")]
    Convert(#[from] DomainError),
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
    #[error("unsupported message: type={message_type}, node={node_id}, source={source_id}")]
    Unsupported {
        message_type: String,
        node_id: String,
        source_id: String,
    },
}

impl From<mc_storage::StorageError> for ProcessorError {
    fn from(err: mc_storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
