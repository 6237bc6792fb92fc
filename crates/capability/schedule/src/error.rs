use domain::DomainError;

/// 调度引擎错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid schedule: {0}")]
    Config(String),
    #[error("invalid value: {0}")]
    Domain(#[from] DomainError),
    #[error("scheduler error: {0}")]
    Scheduler(#[from] mc_scheduler::SchedulerError),
    #[error("script error: {0}")]
    Script(#[from] mc_script::ScriptError),
    #[error("webhook error: {0}")]
    Webhook(String),
    #[error("location error: {0}")]
    Location(String),
    #[error("bus error: {0}")]
    Bus(#[from] mc_bus::BusError),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<mc_storage::StorageError> for ScheduleError {
    fn from(err: mc_storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ScheduleError {
    fn from(err: reqwest::Error) -> Self {
        Self::Webhook(err.to_string())
    }
}
