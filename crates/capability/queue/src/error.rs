/// 队列消费错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("consumer error: {0}")]
    Consumer(String),
    #[error("queue stopped: {0}")]
    Stopped(String),
}

impl QueueError {
    pub fn consumer(err: impl std::fmt::Display) -> Self {
        Self::Consumer(err.to_string())
    }
}
