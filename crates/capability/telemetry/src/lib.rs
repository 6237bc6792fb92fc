//! 日志初始化与进程计数器。

use serde::{Deserialize, Serialize};
use std::env;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt};

/// 指标写入日志使用的 tracing 目标。
pub const METRIC_TARGET: &str = "mc.metric";

/// 日志配置（配置文件 `logger` 段）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggerOptions {
    /// `development` | `production`
    pub mode: String,
    /// `console` | `json`
    pub encoding: String,
    pub level: String,
    /// `mc.metric` 目标的级别，为空时跟随 `level`。
    pub metric_level: String,
    pub enable_stack_trace: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            mode: "development".to_string(),
            encoding: "console".to_string(),
            level: "info".to_string(),
            metric_level: String::new(),
            enable_stack_trace: false,
        }
    }
}

impl LoggerOptions {
    /// 应用 `LOG_MODE` / `LOG_ENCODING` / `LOG_LEVEL_METRIC` / `LOG_ENABLE_STACK_TRACE`。
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(mode) = read_optional("LOG_MODE") {
            self.mode = mode;
        }
        if let Some(encoding) = read_optional("LOG_ENCODING") {
            self.encoding = encoding;
        }
        if let Some(level) = read_optional("LOG_LEVEL_METRIC") {
            self.metric_level = level;
        }
        if let Some(flag) = read_optional("LOG_ENABLE_STACK_TRACE") {
            self.enable_stack_trace =
                matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "on");
        }
        self
    }

    pub fn is_json(&self) -> bool {
        self.encoding.eq_ignore_ascii_case("json")
    }

    pub fn is_production(&self) -> bool {
        self.mode.eq_ignore_ascii_case("production")
    }

    /// `mc.metric` 目标的过滤指令；未单独配置时为 `None`。
    pub fn metric_directive(&self) -> Option<String> {
        let level = self.metric_level.trim();
        (!level.is_empty()).then(|| format!("{METRIC_TARGET}={}", level.to_ascii_lowercase()))
    }

    /// 默认过滤指令：全局级别，加上可选的 `mc.metric` 级别。
    pub fn filter_directives(&self) -> String {
        let level = self.level.trim();
        let level = if level.is_empty() {
            "info".to_string()
        } else {
            level.to_ascii_lowercase()
        };
        match self.metric_directive() {
            Some(metric) => format!("{level},{metric}"),
            None => level,
        }
    }
}

/// 初始化 tracing。RUST_LOG 优先，其次配置级别，默认 info；
/// `LOG_LEVEL_METRIC` 只作用于 `mc.metric` 目标。重复调用无副作用。
pub fn init_tracing(options: &LoggerOptions) {
    let options = options.clone().with_env_overrides();
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.filter_directives()));
    if let Some(metric) = options.metric_directive()
        && let Ok(directive) = metric.parse::<Directive>()
    {
        filter = filter.add_directive(directive);
    }
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(options.enable_stack_trace)
        .with_line_number(options.enable_stack_trace);
    let _ = if options.is_json() {
        builder.json().try_init()
    } else if options.is_production() {
        builder.with_ansi(false).try_init()
    } else {
        builder.try_init()
    };
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_produced: u64,
    pub queue_dropped: u64,
    pub bus_published: u64,
    pub processor_messages: u64,
    pub processor_failed: u64,
    pub metric_writes: u64,
    pub sleeping_dropped: u64,
    pub handler_posts_ok: u64,
    pub handler_posts_failed: u64,
    pub schedule_triggers: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    queue_produced: AtomicU64,
    queue_dropped: AtomicU64,
    bus_published: AtomicU64,
    processor_messages: AtomicU64,
    processor_failed: AtomicU64,
    metric_writes: AtomicU64,
    sleeping_dropped: AtomicU64,
    handler_posts_ok: AtomicU64,
    handler_posts_failed: AtomicU64,
    schedule_triggers: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            queue_produced: AtomicU64::new(0),
            queue_dropped: AtomicU64::new(0),
            bus_published: AtomicU64::new(0),
            processor_messages: AtomicU64::new(0),
            processor_failed: AtomicU64::new(0),
            metric_writes: AtomicU64::new(0),
            sleeping_dropped: AtomicU64::new(0),
            handler_posts_ok: AtomicU64::new(0),
            handler_posts_failed: AtomicU64::new(0),
            schedule_triggers: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_produced: self.queue_produced.load(Ordering::Relaxed),
            queue_dropped: self.queue_dropped.load(Ordering::Relaxed),
            bus_published: self.bus_published.load(Ordering::Relaxed),
            processor_messages: self.processor_messages.load(Ordering::Relaxed),
            processor_failed: self.processor_failed.load(Ordering::Relaxed),
            metric_writes: self.metric_writes.load(Ordering::Relaxed),
            sleeping_dropped: self.sleeping_dropped.load(Ordering::Relaxed),
            handler_posts_ok: self.handler_posts_ok.load(Ordering::Relaxed),
            handler_posts_failed: self.handler_posts_failed.load(Ordering::Relaxed),
            schedule_triggers: self.schedule_triggers.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

pub fn record_queue_produced() {
    metrics().queue_produced.fetch_add(1, Ordering::Relaxed);
}

pub fn record_queue_dropped() {
    metrics().queue_dropped.fetch_add(1, Ordering::Relaxed);
}

pub fn record_bus_published() {
    metrics().bus_published.fetch_add(1, Ordering::Relaxed);
}

/// 记录处理器处理的消息数。
pub fn record_processor_message() {
    metrics().processor_messages.fetch_add(1, Ordering::Relaxed);
}

pub fn record_processor_failed() {
    metrics().processor_failed.fetch_add(1, Ordering::Relaxed);
}

pub fn record_metric_write() {
    metrics().metric_writes.fetch_add(1, Ordering::Relaxed);
}

/// 记录休眠队列截断丢弃的条数。
pub fn record_sleeping_dropped(count: u64) {
    metrics()
        .sleeping_dropped
        .fetch_add(count, Ordering::Relaxed);
}

pub fn record_handler_post(ok: bool) {
    let metrics = metrics();
    if ok {
        metrics.handler_posts_ok.fetch_add(1, Ordering::Relaxed);
    } else {
        metrics.handler_posts_failed.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_schedule_trigger() {
    metrics().schedule_triggers.fetch_add(1, Ordering::Relaxed);
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}
