//! 服务装配与生命周期：按序启动，逆序关停。

use crate::cli::Mode;
use domain::resource::{RESOURCE_GATEWAY, RESOURCE_HANDLER, RESOURCE_SCHEDULE};
use domain::{
    GatewayConfig, HandlerConfig, ResourceCommand, ResourceEvent, ScheduleConfig, ServiceFilter,
    topics,
};
use futures::future::BoxFuture;
use mc_bus::{Bus, BusError};
use mc_config::{AppConfig, ConfigError};
use mc_gateway::{GatewayManager, ProviderRegistry};
use mc_handler::{HandlerError, HandlerRegistry, HandlerService};
use mc_processor::{MessageProcessor, ProcessorError, ProcessorService};
use mc_resource::{ResourceError, ResourceManager, ServiceListener};
use mc_schedule::{ScheduleError, ScheduleService};
use mc_scheduler::Scheduler;
use mc_storage::{StorageError, Stores, init_stores};
use std::sync::Arc;
use tracing::{info, warn};

/// 启动失败。
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

type CloseFn = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct Closer {
    name: &'static str,
    close: CloseFn,
}

/// 运行中的服务集合。
pub struct Runtime {
    mode: Mode,
    bus: Bus,
    stores: Stores,
    gateways: Option<Arc<GatewayManager>>,
    closers: Vec<Closer>,
}

impl Runtime {
    /// 初始化总线、调度器、存储并启动当前模式下的服务。
    pub async fn start(config: &AppConfig, mode: Mode) -> Result<Self, RuntimeError> {
        let bus = Bus::new(&config.bus)?;
        let scheduler = Scheduler::new();
        let mut runtime = Self {
            mode,
            bus: bus.clone(),
            stores: Stores::in_memory(),
            gateways: None,
            closers: Vec::new(),
        };
        {
            let scheduler = scheduler.clone();
            runtime.push("scheduler", move || async move { scheduler.close().await });
        }
        {
            let bus = bus.clone();
            runtime.push("bus", move || async move {
                if let Err(err) = bus.close() {
                    warn!(target: "mc.server", error = %err, "bus_close_failed");
                }
            });
        }

        if let Err(err) = runtime.start_services(config, &scheduler).await {
            runtime.shutdown().await;
            return Err(err);
        }
        runtime.load_all();
        info!(target: "mc.server", mode = %mode.as_str(), "runtime_started");
        Ok(runtime)
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn gateways(&self) -> Option<&Arc<GatewayManager>> {
        self.gateways.as_ref()
    }

    async fn start_services(
        &mut self,
        config: &AppConfig,
        scheduler: &Scheduler,
    ) -> Result<(), RuntimeError> {
        config.directories.ensure()?;
        self.stores = init_stores(&config.storage, &config.metric)?;
        let bus = self.bus.clone();
        let stores = self.stores.clone();
        let mut listeners = Vec::new();

        if self.mode.runs_core() {
            let processor = Arc::new(ProcessorService::start(
                &bus,
                Arc::new(MessageProcessor::new(stores.clone(), bus.clone())),
            )?);
            self.push("processor", move || async move { processor.stop().await });
        }

        if self.mode.runs_handler() {
            let handlers = Arc::new(HandlerService::new(
                HandlerRegistry::with_builtin(),
                bus.clone(),
                scheduler.clone(),
                stores.clone(),
                config.directories.data.clone(),
            ));
            handlers.start().await?;
            let manager: Arc<dyn ResourceManager<HandlerConfig>> = handlers.clone();
            listeners.push(ServiceListener::start(
                &bus,
                topics::SERVICE_NOTIFY_HANDLER,
                config.handler.clone(),
                manager,
            )?);
            self.push("handlers", move || async move { handlers.stop().await });
        }

        if self.mode.runs_core() {
            let schedules = ScheduleService::new(
                bus.clone(),
                scheduler.clone(),
                stores.clone(),
                config.schedule.location,
            );
            schedules.start()?;
            let manager: Arc<dyn ResourceManager<ScheduleConfig>> = Arc::new(schedules.clone());
            listeners.push(ServiceListener::start(
                &bus,
                topics::SERVICE_SCHEDULER,
                ServiceFilter::default(),
                manager,
            )?);
            self.push("schedules", move || async move { schedules.stop() });
        }

        let listeners = Arc::new(listeners);
        self.push("resource", move || async move {
            for listener in listeners.iter() {
                listener.stop().await;
            }
        });

        if self.mode.runs_gateway() {
            let gateways = Arc::new(GatewayManager::new(
                ProviderRegistry::with_builtin(),
                bus.clone(),
                scheduler.clone(),
                stores.clone(),
            ));
            let manager: Arc<dyn ResourceManager<GatewayConfig>> = gateways.clone();
            let listener = ServiceListener::start(
                &bus,
                topics::SERVICE_GATEWAY,
                config.gateway.clone(),
                manager,
            )?;
            self.gateways = Some(Arc::clone(&gateways));
            self.push("gateways", move || async move {
                listener.stop().await;
                gateways.unload_all().await;
            });
        }
        Ok(())
    }

    /// 为已启动的服务发布 loadAll。
    fn load_all(&self) {
        let mut targets = Vec::new();
        if self.mode.runs_core() {
            targets.push((RESOURCE_SCHEDULE, topics::SERVICE_SCHEDULER));
        }
        if self.mode.runs_handler() {
            targets.push((RESOURCE_HANDLER, topics::SERVICE_NOTIFY_HANDLER));
        }
        if self.mode.runs_gateway() {
            targets.push((RESOURCE_GATEWAY, topics::SERVICE_GATEWAY));
        }
        for (resource_type, topic) in targets {
            let event = ResourceEvent::new(resource_type, ResourceCommand::LoadAll);
            if let Err(err) = self.bus.publish(topic, &event) {
                warn!(target: "mc.server", resource = %resource_type, error = %err, "load_all_publish_failed");
            }
        }
    }

    fn push<F, Fut>(&mut self, name: &'static str, close: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.closers.push(Closer {
            name,
            close: Box::new(move || Box::pin(close())),
        });
    }

    /// 逆序关停。
    pub async fn shutdown(mut self) {
        while let Some(closer) = self.closers.pop() {
            info!(target: "mc.server", component = closer.name, "component_stopping");
            (closer.close)().await;
        }
        info!(target: "mc.server", "runtime_stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::PluginConfig;
    use std::time::Duration;

    fn config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::from_yaml("secret: test-secret\n").expect("config");
        config.directories.data = dir.join("data");
        config.directories.logs = dir.join("logs");
        config
    }

    #[tokio::test]
    async fn all_in_one_starts_gateways_from_storage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runtime = Runtime::start(&config(dir.path()), Mode::AllInOne)
            .await
            .expect("start");
        assert!(dir.path().join("data").is_dir());
        assert!(dir.path().join("logs").is_dir());

        runtime
            .stores()
            .gateways
            .save(GatewayConfig {
                id: "virtual-1".to_string(),
                enabled: true,
                provider: PluginConfig::with_type("virtual"),
                ..Default::default()
            })
            .await
            .expect("save");
        runtime
            .bus()
            .publish(
                topics::SERVICE_GATEWAY,
                &ResourceEvent::new(RESOURCE_GATEWAY, ResourceCommand::Start).with_id("virtual-1"),
            )
            .expect("publish");

        let gateways = Arc::clone(runtime.gateways().expect("gateway manager"));
        let mut loaded = false;
        for _ in 0..200 {
            if gateways.loaded_ids() == vec!["virtual-1".to_string()] {
                loaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(loaded);

        runtime.shutdown().await;
        assert!(gateways.loaded_ids().is_empty());
    }

    #[tokio::test]
    async fn unsupported_bus_fails_startup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = config(dir.path());
        config.bus.backend = "natsio".to_string();
        let err = Runtime::start(&config, Mode::Server).await.err().expect("error");
        assert!(matches!(err, RuntimeError::Bus(BusError::UnsupportedBackend(_))));
    }

    #[tokio::test]
    async fn gateway_mode_skips_core_services() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runtime = Runtime::start(&config(dir.path()), Mode::Gateway)
            .await
            .expect("start");
        assert!(runtime.gateways().is_some());
        let names: Vec<&str> = runtime.closers.iter().map(|closer| closer.name).collect();
        assert_eq!(names, vec!["scheduler", "bus", "resource", "gateways"]);
        runtime.shutdown().await;
    }
}
