/// 资源分发错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("missing resource id")]
    MissingId,
    #[error("load error: {0}")]
    Load(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("bus error: {0}")]
    Bus(#[from] mc_bus::BusError),
}

impl From<mc_storage::StorageError> for ResourceError {
    fn from(err: mc_storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
