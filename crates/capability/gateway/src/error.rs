/// 网关错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("queue rejected message: {0}")]
    QueueFull(String),
    #[error("ack timeout: gateway={gateway_id}, message={msg_id}")]
    AckTimeout { gateway_id: String, msg_id: String },
    #[error("ack wait cancelled")]
    Cancelled,
    #[error("gateway not running: {0}")]
    NotRunning(String),
    #[error("bus error: {0}")]
    Bus(#[from] mc_bus::BusError),
    #[error("storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    pub fn provider(err: impl std::fmt::Display) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<mc_storage::StorageError> for GatewayError {
    fn from(err: mc_storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
