use crate::consumer::QueueConsumer;
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 首次重试等待时间。
pub const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);

/// 丢弃回调。
pub type DropFn<T> = Arc<dyn Fn(T) + Send + Sync>;

/// 重试策略。`max_retries == 0` 表示无限重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

/// 队列参数。
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: String,
    pub capacity: usize,
    pub workers: usize,
    pub retry: Option<RetryPolicy>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "queue".to_string(),
            capacity: 100,
            workers: 1,
            retry: None,
        }
    }
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, capacity: usize, workers: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            workers,
            retry: None,
        }
    }

    pub fn with_retry(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.retry = Some(RetryPolicy {
            max_retries,
            base_delay,
        });
        self
    }

    fn sanitized(mut self) -> Self {
        if self.capacity == 0 {
            self.capacity = 1;
        }
        if self.workers == 0 {
            self.workers = 1;
        }
        if self.name.trim().is_empty() {
            self.name = "queue".to_string();
        }
        self
    }
}

struct QueueInner<T> {
    name: String,
    items: Mutex<VecDeque<T>>,
    notify: Notify,
    size: AtomicUsize,
    capacity: AtomicUsize,
    stopped: AtomicBool,
    cancel: CancellationToken,
    retry: Option<RetryPolicy>,
    on_dropped: DropFn<T>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// 有界队列，克隆共享同一实例。
pub struct BoundedQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> BoundedQueue<T>
where
    T: Clone + Send + 'static,
{
    /// 创建队列并立即启动 `config.workers` 个 worker（需在 tokio 运行时内调用）。
    pub fn new(
        config: QueueConfig,
        consumer: Arc<dyn QueueConsumer<T>>,
        on_dropped: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        let config = config.sanitized();
        let inner = Arc::new(QueueInner {
            name: config.name.clone(),
            items: Mutex::new(VecDeque::with_capacity(config.capacity)),
            notify: Notify::new(),
            size: AtomicUsize::new(0),
            capacity: AtomicUsize::new(config.capacity),
            stopped: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            retry: config.retry,
            on_dropped: Arc::new(on_dropped),
            workers: Mutex::new(Vec::with_capacity(config.workers)),
        });

        let handles: Vec<JoinHandle<()>> = (0..config.workers)
            .map(|worker| {
                let inner = Arc::clone(&inner);
                let consumer = Arc::clone(&consumer);
                tokio::spawn(async move { inner.run_worker(worker, consumer).await })
            })
            .collect();
        if let Ok(mut workers) = inner.workers.lock() {
            workers.extend(handles);
        }
        debug!(
            target: "mc.queue",
            queue = %config.name,
            capacity = config.capacity,
            workers = config.workers,
            "queue_started"
        );
        Self { inner }
    }

    /// 非阻塞写入。已满或已停止时调用 `on_dropped` 并返回 false。
    pub fn produce(&self, item: T) -> bool {
        let rejected = match self.inner.lock_items() {
            Some(mut items) => {
                let capacity = self.inner.capacity.load(Ordering::SeqCst);
                let reserved = !self.inner.stopped.load(Ordering::SeqCst)
                    && self
                        .inner
                        .size
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |size| {
                            (size < capacity).then_some(size + 1)
                        })
                        .is_ok();
                if reserved {
                    items.push_back(item);
                    None
                } else {
                    Some(item)
                }
            }
            None => Some(item),
        };

        match rejected {
            None => {
                self.inner.notify.notify_one();
                mc_telemetry::record_queue_produced();
                true
            }
            Some(item) => {
                debug!(target: "mc.queue", queue = %self.inner.name, "item_dropped_on_produce");
                self.inner.drop_item(item);
                false
            }
        }
    }

    /// 已入队及处理中的条目数。
    pub fn size(&self) -> usize {
        self.inner.size.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// 调整容量，容量未变化时返回 false。
    ///
    /// 缩容时从队尾丢弃超出新容量的待处理条目（交给 `on_dropped`）；
    /// worker 正在处理的条目无法丢弃，处理完成前仍计入 `size`。
    pub fn resize(&self, capacity: usize) -> bool {
        let capacity = capacity.max(1);
        let mut overflow = Vec::new();
        let previous = match self.inner.lock_items() {
            Some(mut items) => {
                let previous = self.inner.capacity.swap(capacity, Ordering::SeqCst);
                while self.inner.size.load(Ordering::SeqCst) > capacity {
                    let Some(item) = items.pop_back() else {
                        break;
                    };
                    self.inner.size.fetch_sub(1, Ordering::SeqCst);
                    overflow.push(item);
                }
                previous
            }
            None => self.inner.capacity.swap(capacity, Ordering::SeqCst),
        };
        if previous == capacity {
            return false;
        }
        info!(
            target: "mc.queue",
            queue = %self.inner.name,
            from = previous,
            to = capacity,
            dropped = overflow.len(),
            "queue_resized"
        );
        for item in overflow {
            self.inner.drop_item(item);
        }
        true
    }

    /// 停止队列：通知 worker 退出并等待，剩余条目交给 `on_dropped`。幂等。
    pub async fn stop(&self) {
        {
            // 与 produce 共用条目锁，保证停止后不再有新条目入队。
            let _items = self.inner.lock_items();
            if self.inner.stopped.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        self.inner.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = match self.inner.workers.lock() {
            Ok(mut workers) => workers.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(target: "mc.queue", queue = %self.inner.name, error = %err, "worker_join_failed");
            }
        }

        let leftovers: Vec<T> = match self.inner.lock_items() {
            Some(mut items) => items.drain(..).collect(),
            None => Vec::new(),
        };
        if !leftovers.is_empty() {
            warn!(
                target: "mc.queue",
                queue = %self.inner.name,
                count = leftovers.len(),
                "queue_stopped_with_pending_items"
            );
        }
        for item in leftovers {
            self.inner.size.fetch_sub(1, Ordering::SeqCst);
            self.inner.drop_item(item);
        }
        debug!(target: "mc.queue", queue = %self.inner.name, "queue_stopped");
    }
}

impl<T> QueueInner<T>
where
    T: Clone + Send + 'static,
{
    fn lock_items(&self) -> Option<MutexGuard<'_, VecDeque<T>>> {
        self.items.lock().ok()
    }

    fn pop(&self) -> Option<T> {
        self.lock_items().and_then(|mut items| items.pop_front())
    }

    fn drop_item(&self, item: T) {
        mc_telemetry::record_queue_dropped();
        (self.on_dropped)(item);
    }

    async fn run_worker(self: Arc<Self>, worker: usize, consumer: Arc<dyn QueueConsumer<T>>) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.pop() {
                Some(item) => {
                    self.process(worker, consumer.as_ref(), item).await;
                    self.size.fetch_sub(1, Ordering::SeqCst);
                }
                None => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = self.notify.notified() => {}
                    }
                }
            }
        }
        debug!(target: "mc.queue", queue = %self.name, worker, "worker_exited");
    }

    /// 处理单个条目；重试期间 worker 不拉取新条目。
    async fn process(&self, worker: usize, consumer: &dyn QueueConsumer<T>, item: T) {
        let mut failures: u32 = 0;
        let mut delay = match self.retry {
            Some(retry) => INITIAL_RETRY_DELAY.min(retry.base_delay),
            None => INITIAL_RETRY_DELAY,
        };
        loop {
            let outcome = AssertUnwindSafe(consumer.consume(item.clone()))
                .catch_unwind()
                .await;
            let err = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(err)) => err,
                Err(_) => {
                    error!(target: "mc.queue", queue = %self.name, worker, "consumer_panicked");
                    self.drop_item(item);
                    return;
                }
            };

            let Some(retry) = self.retry else {
                warn!(target: "mc.queue", queue = %self.name, worker, error = %err, "consume_failed");
                return;
            };
            failures = failures.saturating_add(1);
            if retry.max_retries > 0 && failures > retry.max_retries {
                warn!(
                    target: "mc.queue",
                    queue = %self.name,
                    worker,
                    attempts = failures,
                    error = %err,
                    "retry_exhausted"
                );
                self.drop_item(item);
                return;
            }

            debug!(
                target: "mc.queue",
                queue = %self.name,
                worker,
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "consume_retry_scheduled"
            );
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.drop_item(item);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, retry.base_delay);
        }
    }
}

fn next_delay(current: Duration, cap: Duration) -> Duration {
    current.saturating_mul(2).min(cap.max(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_cap() {
        let cap = Duration::from_millis(500);
        let mut delay = INITIAL_RETRY_DELAY;
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(delay.as_millis());
            delay = next_delay(delay, cap);
        }
        assert_eq!(seen, vec![100, 200, 400, 500, 500]);
    }

    #[test]
    fn sanitized_config_has_room() {
        let config = QueueConfig::new("", 0, 0).sanitized();
        assert_eq!(config.capacity, 1);
        assert_eq!(config.workers, 1);
        assert_eq!(config.name, "queue");
    }
}
