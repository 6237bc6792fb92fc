/// 调度器错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid job spec {spec}: {reason}")]
    InvalidSpec { spec: String, reason: String },
    #[error("scheduler lock failed")]
    Lock,
    #[error("scheduler closed")]
    Closed,
}
