//! 用户调度引擎。
//!
//! 把 [`domain::ScheduleConfig`] 翻译成核心调度器任务（`user_schedule_<id>`），
//! 触发时加载变量、渲染处理器参数并发布到 `message.notify_handler`。

mod cron_spec;
mod error;
mod service;
mod validity;
mod variables;

pub use cron_spec::{build_cron_spec, normalize_day_of_week, sun_event_time};
pub use error::ScheduleError;
pub use service::{JOB_PREFIX, SUN_REFRESH_JOB, ScheduleService, job_name};
pub use validity::{is_valid_schedule, pin_on_date};
pub use variables::{DEFAULT_WEBHOOK_TIMEOUT, load_webhook_variables};
