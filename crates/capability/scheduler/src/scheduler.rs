use crate::error::SchedulerError;
use crate::spec::JobSpec;
use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type JobFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// 无任务时的最长休眠。
const IDLE_WAIT: Duration = Duration::from_secs(60);

struct Job {
    spec: JobSpec,
    next: Option<DateTime<Local>>,
    func: JobFn,
}

struct SchedulerInner {
    jobs: Mutex<HashMap<String, Job>>,
    notify: Notify,
    cancel: CancellationToken,
    runner: Mutex<Option<JoinHandle<()>>>,
}

/// 核心调度器，克隆共享同一实例。
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// 创建并启动调度循环（需在 tokio 运行时内调用）。
    pub fn new() -> Self {
        let inner = Arc::new(SchedulerInner {
            jobs: Mutex::new(HashMap::new()),
            notify: Notify::new(),
            cancel: CancellationToken::new(),
            runner: Mutex::new(None),
        });
        let handle = tokio::spawn(Arc::clone(&inner).run());
        if let Ok(mut runner) = inner.runner.lock() {
            *runner = Some(handle);
        }
        info!(target: "mc.scheduler", "scheduler_started");
        Self { inner }
    }

    /// 注册任务；同名任务被原子替换。
    pub fn add_func<F, Fut>(&self, name: &str, spec: &str, func: F) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.inner.cancel.is_cancelled() {
            return Err(SchedulerError::Closed);
        }
        let spec = JobSpec::parse(spec)?;
        let next = spec.next_after(Local::now());
        let func: JobFn = Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(func()) });
        let replaced = {
            let mut jobs = self.inner.lock()?;
            jobs.insert(name.to_string(), Job { spec, next, func }).is_some()
        };
        self.inner.notify.notify_one();
        debug!(
            target: "mc.scheduler",
            job = %name,
            next = ?next,
            replaced,
            "job_added"
        );
        Ok(())
    }

    pub fn remove_func(&self, name: &str) -> bool {
        let removed = match self.inner.lock() {
            Ok(mut jobs) => jobs.remove(name).is_some(),
            Err(_) => false,
        };
        if removed {
            debug!(target: "mc.scheduler", job = %name, "job_removed");
        }
        removed
    }

    /// 删除名称带指定前缀的全部任务，返回删除数量。
    pub fn remove_with_prefix(&self, prefix: &str) -> usize {
        let removed = match self.inner.lock() {
            Ok(mut jobs) => {
                let before = jobs.len();
                jobs.retain(|name, _| !name.starts_with(prefix));
                before - jobs.len()
            }
            Err(_) => 0,
        };
        debug!(target: "mc.scheduler", prefix = %prefix, removed, "jobs_removed_by_prefix");
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .lock()
            .map(|jobs| jobs.contains_key(name))
            .unwrap_or(false)
    }

    pub fn next_run(&self, name: &str) -> Option<DateTime<Local>> {
        self.inner
            .lock()
            .ok()
            .and_then(|jobs| jobs.get(name).and_then(|job| job.next))
    }

    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .lock()
            .map(|jobs| jobs.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// 停止调度循环并清空任务。幂等；执行中的回调不被中断。
    pub async fn close(&self) {
        self.inner.cancel.cancel();
        let handle = self
            .inner
            .runner
            .lock()
            .ok()
            .and_then(|mut runner| runner.take());
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(target: "mc.scheduler", error = %err, "scheduler_join_failed");
            }
            info!(target: "mc.scheduler", "scheduler_stopped");
        }
        if let Ok(mut jobs) = self.inner.lock() {
            jobs.clear();
        }
    }
}

impl SchedulerInner {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Job>>, SchedulerError> {
        self.jobs.lock().map_err(|_| SchedulerError::Lock)
    }

    /// 取出到期任务并推进下一次触发时间，返回到期回调与下次等待时长。
    fn take_due(&self, now: DateTime<Local>) -> (Vec<(String, JobFn)>, Duration) {
        let Ok(mut jobs) = self.lock() else {
            return (Vec::new(), IDLE_WAIT);
        };
        let mut due = Vec::new();
        let mut wait = IDLE_WAIT;
        for (name, job) in jobs.iter_mut() {
            let Some(next) = job.next else {
                continue;
            };
            if next <= now {
                due.push((name.clone(), Arc::clone(&job.func)));
                job.next = job.spec.next_after(now);
            }
            if let Some(next) = job.next {
                let until = (next - now).to_std().unwrap_or(Duration::ZERO);
                wait = wait.min(until);
            }
        }
        (due, wait)
    }

    async fn run(self: Arc<Self>) {
        loop {
            let (due, wait) = self.take_due(Local::now());
            for (name, func) in due {
                debug!(target: "mc.scheduler", job = %name, "job_fired");
                tokio::spawn(func());
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}
