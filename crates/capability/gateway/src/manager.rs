use crate::provider::ProviderRegistry;
use crate::service::GatewayService;
use async_trait::async_trait;
use domain::resource::RESOURCE_GATEWAY;
use domain::{GatewayConfig, State, StatusType};
use mc_bus::Bus;
use mc_resource::{ResourceError, ResourceManager};
use mc_scheduler::Scheduler;
use mc_storage::Stores;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{info, warn};

/// 已加载网关的集合，由 `service.gateway` 事件驱动。
pub struct GatewayManager {
    registry: ProviderRegistry,
    bus: Bus,
    scheduler: Scheduler,
    stores: Stores,
    services: RwLock<HashMap<String, GatewayService>>,
}

impl GatewayManager {
    pub fn new(registry: ProviderRegistry, bus: Bus, scheduler: Scheduler, stores: Stores) -> Self {
        Self {
            registry,
            bus,
            scheduler,
            stores,
            services: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &str) -> Option<GatewayService> {
        self.services
            .read()
            .ok()
            .and_then(|services| services.get(id).cloned())
    }

    /// 停止全部网关（关停流程使用）。
    pub async fn unload_all(&self) {
        let ids = self.loaded_ids();
        for id in ids {
            if let Err(err) = self.unload(&id).await {
                warn!(target: "mc.gateway", gateway = %id, error = %err, "gateway_unload_failed");
            }
        }
    }

    fn take(&self, id: &str) -> Result<Option<GatewayService>, ResourceError> {
        let mut services = self
            .services
            .write()
            .map_err(|_| ResourceError::Load("lock failed".to_string()))?;
        Ok(services.remove(id))
    }

    /// 存储中存在该网关时回写状态。
    async fn persist_state(&self, id: &str, state: State) {
        match self.stores.gateways.get(id).await {
            Ok(Some(mut config)) => {
                config.state = state;
                if let Err(err) = self.stores.gateways.save(config).await {
                    warn!(target: "mc.gateway", gateway = %id, error = %err, "gateway_state_save_failed");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(target: "mc.gateway", gateway = %id, error = %err, "gateway_state_load_failed");
            }
        }
    }
}

#[async_trait]
impl ResourceManager<GatewayConfig> for GatewayManager {
    fn resource_type(&self) -> &str {
        RESOURCE_GATEWAY
    }

    async fn list_configs(&self) -> Result<Vec<GatewayConfig>, ResourceError> {
        Ok(self.stores.gateways.list().await?)
    }

    async fn get_config(&self, id: &str) -> Result<Option<GatewayConfig>, ResourceError> {
        Ok(self.stores.gateways.get(id).await?)
    }

    async fn load(&self, config: GatewayConfig) -> Result<(), ResourceError> {
        let id = config.id.clone();
        self.unload(&id).await?;

        let service = match GatewayService::new(
            config,
            &self.registry,
            self.bus.clone(),
            self.scheduler.clone(),
        ) {
            Ok(service) => service,
            Err(err) => {
                self.persist_state(&id, State::new(StatusType::Error, err.to_string()))
                    .await;
                return Err(ResourceError::Load(err.to_string()));
            }
        };
        if let Err(err) = service.start().await {
            self.persist_state(&id, State::new(StatusType::Error, err.to_string()))
                .await;
            return Err(ResourceError::Load(err.to_string()));
        }

        self.services
            .write()
            .map_err(|_| ResourceError::Load("lock failed".to_string()))?
            .insert(id.clone(), service);
        self.persist_state(&id, State::new(StatusType::Up, "started successfully"))
            .await;
        info!(target: "mc.gateway", gateway = %id, "gateway_loaded");
        Ok(())
    }

    async fn unload(&self, id: &str) -> Result<(), ResourceError> {
        let Some(service) = self.take(id)? else {
            return Ok(());
        };
        if let Err(err) = service.stop().await {
            warn!(target: "mc.gateway", gateway = %id, error = %err, "gateway_stop_failed");
        }
        self.persist_state(id, State::new(StatusType::Down, "stopped by request"))
            .await;
        info!(target: "mc.gateway", gateway = %id, "gateway_unloaded");
        Ok(())
    }

    fn loaded_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .services
            .read()
            .map(|services| services.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    async fn disable(&self, id: &str) -> Result<(), ResourceError> {
        let mut config = self
            .stores
            .gateways
            .get(id)
            .await?
            .ok_or_else(|| ResourceError::NotFound(id.to_string()))?;
        config.enabled = false;
        self.stores.gateways.save(config).await?;
        self.unload(id).await
    }
}
