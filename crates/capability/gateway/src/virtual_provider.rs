use crate::error::GatewayError;
use crate::provider::{Provider, RawSink};
use async_trait::async_trait;
use domain::{GatewayConfig, Message, RawMessage};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// 内置 Provider 类型。
pub const PROVIDER_VIRTUAL: &str = "virtual";

/// 无真实设备的 Provider：原始帧为 JSON 编码的 [`Message`]（或其数组）。
///
/// `loopback: true` 时下发的消息会作为接收消息回送，模拟设备立即应答。
pub struct VirtualProvider {
    gateway_id: String,
    loopback: bool,
    fail_posts: AtomicBool,
    sink: Mutex<Option<RawSink>>,
    posted: Mutex<Vec<Message>>,
}

impl VirtualProvider {
    pub fn new(gateway_id: &str) -> Self {
        Self {
            gateway_id: gateway_id.to_string(),
            loopback: false,
            fail_posts: AtomicBool::new(false),
            sink: Mutex::new(None),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut provider = Self::new(&config.id);
        provider.loopback = config
            .provider
            .get("loopback")
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        provider
    }

    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// 模拟设备离线：后续 `post` 全部失败。
    pub fn set_fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    /// 已成功下发的消息。
    pub fn posted(&self) -> Vec<Message> {
        self.posted
            .lock()
            .map(|posted| posted.clone())
            .unwrap_or_default()
    }

    /// 模拟设备上报一帧。
    pub fn inject(&self, raw: RawMessage) -> Result<(), GatewayError> {
        let sink = self
            .sink
            .lock()
            .ok()
            .and_then(|sink| sink.clone())
            .ok_or_else(|| GatewayError::NotRunning(self.gateway_id.clone()))?;
        sink(raw)
    }

    pub fn inject_message(&self, message: &Message) -> Result<(), GatewayError> {
        let data = serde_json::to_vec(message).map_err(GatewayError::provider)?;
        self.inject(RawMessage::received(data))
    }
}

#[async_trait]
impl Provider for VirtualProvider {
    fn name(&self) -> &str {
        PROVIDER_VIRTUAL
    }

    async fn start(&self, sink: RawSink) -> Result<(), GatewayError> {
        let mut slot = self
            .sink
            .lock()
            .map_err(|_| GatewayError::provider("lock failed"))?;
        *slot = Some(sink);
        info!(target: "mc.gateway", gateway = %self.gateway_id, loopback = self.loopback, "virtual_provider_started");
        Ok(())
    }

    async fn close(&self) -> Result<(), GatewayError> {
        if let Ok(mut slot) = self.sink.lock() {
            slot.take();
        }
        Ok(())
    }

    async fn post(&self, message: &Message) -> Result<(), GatewayError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(GatewayError::provider("device unreachable"));
        }
        if let Ok(mut posted) = self.posted.lock() {
            posted.push(message.clone());
        }
        debug!(target: "mc.gateway", gateway = %self.gateway_id, node = %message.node_id, "virtual_message_posted");
        if self.loopback {
            let mut echo = message.clone();
            echo.is_received = true;
            self.inject_message(&echo)?;
        }
        Ok(())
    }

    async fn process_received(&self, raw: RawMessage) -> Result<Vec<Message>, GatewayError> {
        let value: serde_json::Value =
            serde_json::from_slice(&raw.data).map_err(GatewayError::provider)?;
        let mut messages: Vec<Message> = if value.is_array() {
            serde_json::from_value(value).map_err(GatewayError::provider)?
        } else {
            vec![serde_json::from_value(value).map_err(GatewayError::provider)?]
        };
        for message in &mut messages {
            message.is_received = raw.is_received;
        }
        Ok(messages)
    }
}
