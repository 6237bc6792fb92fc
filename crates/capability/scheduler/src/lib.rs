//! 核心调度器：按名称注册的 cron / `@every` 任务。
//!
//! 单个协作循环负责计时，每次触发在新任务中执行回调，互不阻塞。

mod error;
mod scheduler;
mod spec;

pub use error::SchedulerError;
pub use scheduler::Scheduler;
pub use spec::JobSpec;
