//! 领域层错误类型。

/// 值转换、时长解析等领域层错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    #[error("invalid value for {metric_type}: {value}")]
    InvalidValue { metric_type: String, value: String },
    #[error("invalid geo value: {0}")]
    InvalidGeo(String),
    #[error("invalid date or time: {0}")]
    InvalidDateTime(String),
}
