use crate::error::HandlerError;
use crate::handler::Handler;
use crate::noop::{HANDLER_NOOP, NoopHandler};
use crate::resource::{HANDLER_RESOURCE, ResourceHandler};
use domain::HandlerConfig;
use mc_bus::Bus;
use mc_scheduler::Scheduler;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// 处理器构造上下文。
#[derive(Clone)]
pub struct HandlerContext {
    pub config: HandlerConfig,
    pub bus: Bus,
    pub scheduler: Scheduler,
    /// 数据根目录，持久化文件位于其下的 `handler/`。
    pub data_root: PathBuf,
}

pub type HandlerFactory =
    Arc<dyn Fn(HandlerContext) -> Result<Arc<dyn Handler>, HandlerError> + Send + Sync>;

/// 处理器注册表：`spec.type` → 工厂。
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: Arc<RwLock<HashMap<String, HandlerFactory>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预注册 `noop` 与 `resource`。
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(
            HANDLER_NOOP,
            Arc::new(|ctx: HandlerContext| {
                let handler: Arc<dyn Handler> = Arc::new(NoopHandler::new(&ctx.config.id));
                Ok(handler)
            }),
        );
        registry.register(
            HANDLER_RESOURCE,
            Arc::new(|ctx: HandlerContext| {
                let handler: Arc<dyn Handler> = Arc::new(ResourceHandler::new(
                    &ctx.config.id,
                    ctx.bus,
                    ctx.scheduler,
                    &ctx.data_root,
                ));
                Ok(handler)
            }),
        );
        registry
    }

    pub fn register(&self, handler_type: &str, factory: HandlerFactory) {
        if let Ok(mut factories) = self.factories.write() {
            factories.insert(handler_type.to_ascii_lowercase(), factory);
        }
    }

    pub fn create(&self, ctx: HandlerContext) -> Result<Arc<dyn Handler>, HandlerError> {
        let handler_type = ctx.config.handler_type().to_ascii_lowercase();
        let factory = self
            .factories
            .read()
            .map_err(|_| HandlerError::Lock)?
            .get(&handler_type)
            .cloned()
            .ok_or_else(|| HandlerError::UnknownType(handler_type.clone()))?;
        factory(ctx)
    }
}
