use crate::error::GatewayError;
use crate::virtual_provider::{PROVIDER_VIRTUAL, VirtualProvider};
use async_trait::async_trait;
use domain::{GatewayConfig, Message, RawMessage};
use mc_bus::Bus;
use mc_scheduler::Scheduler;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// 原始消息入队回调，由网关服务交给 Provider。
pub type RawSink = Arc<dyn Fn(RawMessage) -> Result<(), GatewayError> + Send + Sync>;

/// 设备协议适配器。
///
/// Provider 自行管理 I/O，收到的帧通过 `RawSink` 交回网关服务，
/// 不得直接访问服务内部队列。`post` 对调用方同步：返回 Ok 即已交给设备。
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self, sink: RawSink) -> Result<(), GatewayError>;

    async fn close(&self) -> Result<(), GatewayError>;

    async fn post(&self, message: &Message) -> Result<(), GatewayError>;

    /// 原始帧 → 规范消息。
    async fn process_received(&self, raw: RawMessage) -> Result<Vec<Message>, GatewayError>;
}

/// Provider 构造上下文。
#[derive(Clone)]
pub struct ProviderContext {
    pub gateway: GatewayConfig,
    pub bus: Bus,
    /// 供 Provider 注册 keepalive / 轮询 / 重连任务，任务名需带 [`crate::job_prefix`] 前缀。
    pub scheduler: Scheduler,
}

pub type ProviderFactory =
    Arc<dyn Fn(ProviderContext) -> Result<Arc<dyn Provider>, GatewayError> + Send + Sync>;

/// Provider 注册表：`provider.type` → 工厂。
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: Arc<RwLock<HashMap<String, ProviderFactory>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预注册内置 `virtual` Provider。
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(
            PROVIDER_VIRTUAL,
            Arc::new(|ctx: ProviderContext| {
                let provider: Arc<dyn Provider> = Arc::new(VirtualProvider::from_config(&ctx.gateway));
                Ok(provider)
            }),
        );
        registry
    }

    pub fn register(&self, provider_type: &str, factory: ProviderFactory) {
        if let Ok(mut factories) = self.factories.write() {
            factories.insert(provider_type.to_ascii_lowercase(), factory);
        }
    }

    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .factories
            .read()
            .map(|factories| factories.keys().cloned().collect())
            .unwrap_or_default();
        types.sort();
        types
    }

    /// 按 `ctx.gateway.provider.type` 创建实例。
    pub fn create(&self, ctx: ProviderContext) -> Result<Arc<dyn Provider>, GatewayError> {
        let provider_type = ctx.gateway.provider_type().to_ascii_lowercase();
        let factory = self
            .factories
            .read()
            .ok()
            .and_then(|factories| factories.get(&provider_type).cloned())
            .ok_or_else(|| GatewayError::UnknownProvider(provider_type.clone()))?;
        factory(ctx)
    }
}
