/// 处理器错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("unknown handler type: {0}")]
    UnknownType(String),
    #[error("handler not found: {0}")]
    NotFound(String),
    #[error("handler config error: {0}")]
    Config(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("post failed: {0}")]
    Post(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("bus error: {0}")]
    Bus(#[from] mc_bus::BusError),
    #[error("lock failed")]
    Lock,
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HandlerError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<mc_scheduler::SchedulerError> for HandlerError {
    fn from(err: mc_scheduler::SchedulerError) -> Self {
        Self::Post(err.to_string())
    }
}
