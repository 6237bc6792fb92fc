/// 总线错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("payload type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("malformed frame: {0}")]
    Frame(String),
    #[error("unsupported bus backend: {0}")]
    UnsupportedBackend(String),
    #[error("bus runtime error: {0}")]
    Runtime(String),
    #[error("bus closed")]
    Closed,
    #[error("bus lock failed")]
    Lock,
}
