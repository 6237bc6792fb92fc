use crate::error::ResourceError;
use crate::manager::ResourceManager;
use domain::{Resource, ResourceCommand, ResourceEvent, ServiceFilter};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// 处理单个资源事件。
pub async fn handle_event<C>(
    manager: &dyn ResourceManager<C>,
    filter: &ServiceFilter,
    event: &ResourceEvent,
) -> Result<(), ResourceError>
where
    C: Resource + DeserializeOwned + Send + Sync + 'static,
{
    if !event.resource_type.is_empty() && event.resource_type != manager.resource_type() {
        debug!(
            target: "mc.resource",
            expected = %manager.resource_type(),
            actual = %event.resource_type,
            "resource_event_type_ignored"
        );
        return Ok(());
    }
    debug!(
        target: "mc.resource",
        resource = %manager.resource_type(),
        command = ?event.command,
        id = ?event.id,
        "resource_event_received"
    );

    match event.command {
        ResourceCommand::Add | ResourceCommand::Start => {
            let config = resolve_config(manager, event).await?;
            start(manager, filter, config).await
        }
        ResourceCommand::Stop | ResourceCommand::Remove => {
            let id = match event.id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => id.to_string(),
                None => decode_config::<C>(&event.data)?.resource_id().to_string(),
            };
            manager.unload(&id).await
        }
        ResourceCommand::Reload => {
            let config = resolve_config(manager, event).await?;
            manager.unload(config.resource_id()).await?;
            start(manager, filter, config).await
        }
        ResourceCommand::UnloadAll => {
            for id in manager.loaded_ids() {
                if let Err(err) = manager.unload(&id).await {
                    warn!(target: "mc.resource", id = %id, error = %err, "resource_unload_failed");
                }
            }
            Ok(())
        }
        ResourceCommand::LoadAll => {
            let configs = manager.list_configs().await?;
            let mut loaded = 0usize;
            for config in configs {
                let id = config.resource_id().to_string();
                match start(manager, filter, config).await {
                    Ok(()) => loaded += 1,
                    Err(err) => {
                        warn!(target: "mc.resource", id = %id, error = %err, "resource_load_failed")
                    }
                }
            }
            info!(
                target: "mc.resource",
                resource = %manager.resource_type(),
                processed = loaded,
                "resources_loaded"
            );
            Ok(())
        }
        ResourceCommand::Disable => {
            let id = event
                .id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or(ResourceError::MissingId)?;
            manager.disable(id).await
        }
    }
}

/// 过滤器与启用状态检查后加载。
async fn start<C>(
    manager: &dyn ResourceManager<C>,
    filter: &ServiceFilter,
    config: C,
) -> Result<(), ResourceError>
where
    C: Resource + Send + Sync + 'static,
{
    if !filter.is_mine(
        config.resource_kind(),
        config.resource_id(),
        config.resource_labels(),
    ) {
        debug!(
            target: "mc.resource",
            id = %config.resource_id(),
            "resource_filtered_out"
        );
        return Ok(());
    }
    if !config.is_enabled() {
        debug!(target: "mc.resource", id = %config.resource_id(), "resource_disabled_skipped");
        return Ok(());
    }
    manager.load(config).await
}

/// 优先使用事件携带的配置，否则按 id 从存储读取。
async fn resolve_config<C>(
    manager: &dyn ResourceManager<C>,
    event: &ResourceEvent,
) -> Result<C, ResourceError>
where
    C: Resource + DeserializeOwned + Send + Sync + 'static,
{
    if !event.data.is_null() {
        return decode_config(&event.data);
    }
    let id = event
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(ResourceError::MissingId)?;
    manager
        .get_config(id)
        .await?
        .ok_or_else(|| ResourceError::NotFound(id.to_string()))
}

fn decode_config<C: DeserializeOwned>(data: &serde_json::Value) -> Result<C, ResourceError> {
    serde_json::from_value(data.clone()).map_err(|err| ResourceError::Decode(err.to_string()))
}
