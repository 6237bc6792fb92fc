use crate::backend::{BusBackend, BusHandler, SubscriptionId};
use crate::data::BusData;
use crate::embedded::EmbeddedBackend;
use crate::error::BusError;
use crate::payload::BusPayload;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

pub const BACKEND_EMBEDDED: &str = "embedded";
pub const BACKEND_NATSIO: &str = "natsio";

/// 总线配置（配置文件 `bus` 段）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusOptions {
    #[serde(rename = "type")]
    pub backend: String,
    pub topic_prefix: String,
    /// 外部 broker 地址（natsio）。
    pub server_url: String,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            backend: BACKEND_EMBEDDED.to_string(),
            topic_prefix: String::new(),
            server_url: String::new(),
        }
    }
}

/// 总线客户端，克隆共享同一后端与暂停标志。
#[derive(Clone)]
pub struct Bus {
    backend: Arc<dyn BusBackend>,
    prefix: Arc<str>,
    paused: Arc<AtomicBool>,
}

impl Bus {
    /// 按配置创建总线。
    pub fn new(options: &BusOptions) -> Result<Self, BusError> {
        let backend = options.backend.trim().to_ascii_lowercase();
        match backend.as_str() {
            "" | BACKEND_EMBEDDED => {
                info!(
                    target: "mc.bus",
                    backend = BACKEND_EMBEDDED,
                    prefix = %options.topic_prefix,
                    "bus_initialized"
                );
                Ok(Self::with_backend(
                    Arc::new(EmbeddedBackend::new()),
                    &options.topic_prefix,
                ))
            }
            other => Err(BusError::UnsupportedBackend(other.to_string())),
        }
    }

    /// 无前缀的嵌入式总线。
    pub fn embedded() -> Self {
        Self::with_backend(Arc::new(EmbeddedBackend::new()), "")
    }

    pub fn with_backend(backend: Arc<dyn BusBackend>, prefix: &str) -> Self {
        Self {
            backend,
            prefix: Arc::from(prefix.trim().trim_end_matches('.')),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 附加全局前缀后的 topic。
    pub fn topic(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }

    /// 编码并发布。暂停期间直接返回 Ok。
    pub fn publish<P: BusPayload>(&self, topic: &str, payload: &P) -> Result<(), BusError> {
        if self.is_paused() {
            debug!(target: "mc.bus", topic = %topic, "publish_skipped_paused");
            return Ok(());
        }
        let data = BusData::encode(self.topic(topic), payload)?;
        self.backend.publish(data)?;
        mc_telemetry::record_bus_published();
        Ok(())
    }

    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Result<SubscriptionId, BusError>
    where
        F: Fn(BusData) + Send + Sync + 'static,
    {
        let handler: BusHandler = Arc::new(handler);
        self.backend.subscribe(&self.topic(topic), handler)
    }

    /// 队列组订阅：同组成员中每条消息只投递一次。
    pub fn queue_subscribe<F>(
        &self,
        topic: &str,
        group: &str,
        handler: F,
    ) -> Result<SubscriptionId, BusError>
    where
        F: Fn(BusData) + Send + Sync + 'static,
    {
        let handler: BusHandler = Arc::new(handler);
        self.backend
            .queue_subscribe(&self.topic(topic), group, handler)
    }

    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> Result<(), BusError> {
        self.backend.unsubscribe(&self.topic(topic), id)
    }

    pub fn unsubscribe_all(&self, topic: &str) -> Result<(), BusError> {
        self.backend.unsubscribe_all(&self.topic(topic))
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        info!(target: "mc.bus", "bus_paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        info!(target: "mc.bus", "bus_resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn close(&self) -> Result<(), BusError> {
        self.backend.close()
    }
}
