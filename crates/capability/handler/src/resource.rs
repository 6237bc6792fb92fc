use crate::error::HandlerError;
use crate::handler::{Handler, HandlerData};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use domain::handler::DATA_TYPE_RESOURCE;
use domain::{HandlerPayload, ResourceData, ResourceEvent, parse_duration, topics};
use mc_bus::Bus;
use mc_scheduler::Scheduler;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const HANDLER_RESOURCE: &str = "resource";

/// 等待执行的延迟资源动作（持久化格式）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayedAction {
    pub name: String,
    pub data: ResourceData,
    pub delay: String,
    pub created_at: DateTime<Utc>,
}

/// `<dataRoot>/handler/resource_<handlerID>.yaml`
pub fn persistence_path(data_root: &Path, handler_id: &str) -> PathBuf {
    data_root
        .join("handler")
        .join(format!("resource_{handler_id}.yaml"))
}

/// 把信封中的资源动作转成 `service.<type>` 上的资源事件，支持延迟执行。
pub struct ResourceHandler {
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    bus: Bus,
    scheduler: Scheduler,
    path: PathBuf,
    pending: Mutex<BTreeMap<String, DelayedAction>>,
}

impl ResourceHandler {
    pub fn new(id: &str, bus: Bus, scheduler: Scheduler, data_root: &Path) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: id.to_string(),
                bus,
                scheduler,
                path: persistence_path(data_root, id),
                pending: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// 尚未执行的延迟动作。
    pub async fn pending(&self) -> Vec<DelayedAction> {
        self.inner.pending.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl Handler for ResourceHandler {
    fn name(&self) -> &str {
        HANDLER_RESOURCE
    }

    /// 恢复上次未执行的延迟动作；已到期的立即执行。
    async fn start(&self) -> Result<(), HandlerError> {
        let restored = self.inner.load().await?;
        let now = Utc::now();
        let count = restored.len();
        for (_, action) in restored {
            let total = match parse_duration(&action.delay) {
                Ok(total) => total,
                Err(err) => {
                    warn!(target: "mc.handler", handler = %self.inner.id, action = %action.name, error = %err, "delayed_action_invalid");
                    continue;
                }
            };
            let elapsed = (now - action.created_at).to_std().unwrap_or(Duration::ZERO);
            match total.checked_sub(elapsed) {
                Some(remaining) if !remaining.is_zero() => {
                    Arc::clone(&self.inner).schedule(action, remaining).await?;
                }
                _ => {
                    if let Err(err) = self.inner.execute(&action.data) {
                        warn!(target: "mc.handler", handler = %self.inner.id, action = %action.name, error = %err, "delayed_action_failed");
                    }
                }
            }
        }
        self.inner.persist().await?;
        info!(target: "mc.handler", handler = %self.inner.id, restored = count, "resource_handler_started");
        Ok(())
    }

    /// 只取消定时任务，持久化文件保留到下次启动。
    async fn close(&self) -> Result<(), HandlerError> {
        let removed = self.inner.scheduler.remove_with_prefix(&self.inner.job_prefix());
        debug!(target: "mc.handler", handler = %self.inner.id, jobs = removed, "resource_handler_closed");
        Ok(())
    }

    async fn post(&self, data: &HandlerData) -> Result<(), HandlerError> {
        for (key, raw) in data {
            let Ok(envelope) = serde_yaml::from_str::<HandlerPayload>(raw) else {
                debug!(target: "mc.handler", handler = %self.inner.id, key = %key, "entry_not_an_envelope");
                continue;
            };
            if envelope.disabled || !envelope.data_type.eq_ignore_ascii_case(DATA_TYPE_RESOURCE) {
                continue;
            }
            let resource = decode_resource_data(&envelope.data)?;
            if resource.pre_delay.trim().is_empty() {
                self.inner.execute(&resource)?;
                continue;
            }
            let delay = parse_duration(&resource.pre_delay)
                .map_err(|err| HandlerError::Config(err.to_string()))?;
            let action = DelayedAction {
                name: uuid::Uuid::new_v4().to_string(),
                delay: resource.pre_delay.clone(),
                data: resource,
                created_at: Utc::now(),
            };
            Arc::clone(&self.inner).schedule(action, delay).await?;
        }
        Ok(())
    }
}

/// base64 → YAML → [`ResourceData`]。
fn decode_resource_data(encoded: &str) -> Result<ResourceData, HandlerError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|err| HandlerError::Decode(err.to_string()))?;
    Ok(serde_yaml::from_slice(&bytes)?)
}

impl Inner {
    fn job_prefix(&self) -> String {
        format!("resource_handler_{}_", self.id)
    }

    fn execute(&self, resource: &ResourceData) -> Result<(), HandlerError> {
        let mut event = ResourceEvent::new(&resource.resource_type, resource.command);
        if !resource.resource_id.is_empty() {
            event = event.with_id(&resource.resource_id);
        }
        if !resource.payload.is_null() {
            event = event.with_data(resource.payload.clone());
        }
        self.bus
            .publish(&topics::service_topic(&resource.resource_type), &event)?;
        info!(
            target: "mc.handler",
            handler = %self.id,
            resource_type = %resource.resource_type,
            resource_id = %resource.resource_id,
            command = ?resource.command,
            "resource_action_published"
        );
        Ok(())
    }

    async fn schedule(self: Arc<Self>, action: DelayedAction, delay: Duration) -> Result<(), HandlerError> {
        let name = action.name.clone();
        let job = format!("{}{}", self.job_prefix(), name);
        self.pending.lock().await.insert(name.clone(), action);
        self.persist().await?;

        let inner = Arc::clone(&self);
        let spec = format!("@every {}ms", delay.as_millis().max(1));
        self.scheduler.add_func(&job, &spec, move || {
            let inner = Arc::clone(&inner);
            let name = name.clone();
            async move { inner.fire(&name).await }
        })?;
        debug!(target: "mc.handler", handler = %self.id, job = %job, delay_ms = delay.as_millis() as u64, "resource_action_delayed");
        Ok(())
    }

    async fn fire(&self, name: &str) {
        self.scheduler
            .remove_func(&format!("{}{}", self.job_prefix(), name));
        let action = self.pending.lock().await.remove(name);
        let Some(action) = action else {
            return;
        };
        if let Err(err) = self.persist().await {
            warn!(target: "mc.handler", handler = %self.id, error = %err, "pending_actions_persist_failed");
        }
        if let Err(err) = self.execute(&action.data) {
            warn!(target: "mc.handler", handler = %self.id, action = %name, error = %err, "delayed_action_failed");
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, DelayedAction>, HandlerError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_yaml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// 无待执行动作时删除文件。
    async fn persist(&self) -> Result<(), HandlerError> {
        let pending = self.pending.lock().await;
        if pending.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            };
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_yaml::to_string(&*pending)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}
