use crate::error::HandlerError;
use crate::handler::Handler;
use crate::registry::{HandlerContext, HandlerRegistry};
use async_trait::async_trait;
use domain::resource::RESOURCE_HANDLER;
use domain::{
    Event, EventType, HandlerConfig, HandlerMessage, State, StatusType, topics,
};
use mc_bus::{Bus, SubscriptionId};
use mc_queue::{BoundedQueue, QueueConfig, QueueError, consumer_fn};
use mc_resource::{ResourceError, ResourceManager};
use mc_scheduler::Scheduler;
use mc_storage::Stores;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{info, warn};

/// 分发队列容量。
pub const HANDLER_QUEUE_CAPACITY: usize = 1000;

const QUEUE_NAME: &str = "handler_dispatcher";
/// 多实例部署时同组只有一个实例消费。
const QUEUE_GROUP: &str = "handler_service";
const ENTITY_HANDLER_STATE: &str = "handler_state";

struct Entry {
    handler: Arc<dyn Handler>,
    state: State,
}

struct Shared {
    registry: HandlerRegistry,
    bus: Bus,
    scheduler: Scheduler,
    stores: Stores,
    data_root: PathBuf,
    handlers: RwLock<HashMap<String, Entry>>,
}

struct Running {
    subscription: SubscriptionId,
    queue: BoundedQueue<HandlerMessage>,
}

/// 处理器注册表 + 分发队列；同时作为 `service.notify_handler` 的资源管理器。
pub struct HandlerService {
    shared: Arc<Shared>,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl HandlerService {
    pub fn new(
        registry: HandlerRegistry,
        bus: Bus,
        scheduler: Scheduler,
        stores: Stores,
        data_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry,
                bus,
                scheduler,
                stores,
                data_root: data_root.into(),
                handlers: RwLock::new(HashMap::new()),
            }),
            running: tokio::sync::Mutex::new(None),
        }
    }

    /// 队列订阅 `message.notify_handler`。
    pub async fn start(&self) -> Result<(), HandlerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        let queue = BoundedQueue::new(
            QueueConfig::new(QUEUE_NAME, HANDLER_QUEUE_CAPACITY, 1),
            Arc::new(consumer_fn(move |message: HandlerMessage| {
                let shared = Arc::clone(&shared);
                async move {
                    shared.dispatch(message).await;
                    Ok::<(), QueueError>(())
                }
            })),
            |message: HandlerMessage| {
                warn!(target: "mc.handler", handler = %message.id, "handler_message_dropped");
            },
        );
        let producer = queue.clone();
        let subscription = self.shared.bus.queue_subscribe(
            topics::MESSAGE_NOTIFY_HANDLER,
            QUEUE_GROUP,
            move |data| match data.decode::<HandlerMessage>() {
                Ok(message) => {
                    producer.produce(message);
                }
                Err(err) => {
                    warn!(target: "mc.handler", error = %err, "handler_message_decode_failed");
                }
            },
        );
        let subscription = match subscription {
            Ok(subscription) => subscription,
            Err(err) => {
                queue.stop().await;
                return Err(err.into());
            }
        };
        *running = Some(Running {
            subscription,
            queue,
        });
        info!(target: "mc.handler", topic = topics::MESSAGE_NOTIFY_HANDLER, "handler_service_started");
        Ok(())
    }

    /// 停止分发并关闭全部处理器。
    pub async fn stop(&self) {
        if let Some(running) = self.running.lock().await.take() {
            if let Err(err) = self
                .shared
                .bus
                .unsubscribe(topics::MESSAGE_NOTIFY_HANDLER, running.subscription)
            {
                warn!(target: "mc.handler", error = %err, "unsubscribe_failed");
            }
            running.queue.stop().await;
        }
        for id in self.loaded_ids() {
            if let Err(err) = self.unload(&id).await {
                warn!(target: "mc.handler", handler = %id, error = %err, "handler_unload_failed");
            }
        }
        info!(target: "mc.handler", "handler_service_stopped");
    }

    /// 直接分发（绕过总线与队列）。
    pub async fn post(&self, message: HandlerMessage) {
        self.shared.dispatch(message).await;
    }

    /// 处理器状态：优先取处理器自报的状态，否则为最近一次分发记录的状态。
    pub fn state(&self, id: &str) -> Option<State> {
        self.shared.handlers.read().ok().and_then(|handlers| {
            handlers
                .get(id)
                .map(|entry| entry.handler.state().unwrap_or_else(|| entry.state.clone()))
        })
    }
}

impl Shared {
    async fn dispatch(&self, message: HandlerMessage) {
        let handler = self
            .handlers
            .read()
            .ok()
            .and_then(|handlers| handlers.get(&message.id).map(|entry| Arc::clone(&entry.handler)));
        let Some(handler) = handler else {
            warn!(target: "mc.handler", handler = %message.id, "handler_not_found");
            return;
        };

        let started = Instant::now();
        let result = handler.post(&message.data).await;
        let elapsed = started.elapsed();
        mc_telemetry::record_handler_post(result.is_ok());
        let state = match result {
            Ok(()) => State::new(StatusType::Up, format!("time taken: {elapsed:?}")),
            Err(err) => {
                warn!(target: "mc.handler", handler = %message.id, error = %err, "handler_post_failed");
                State::new(StatusType::Error, err.to_string())
            }
        };
        self.set_state(&message.id, state).await;
    }

    /// 更新内存状态、回写存储并发布 `event.handler`。
    async fn set_state(&self, id: &str, state: State) {
        if let Ok(mut handlers) = self.handlers.write()
            && let Some(entry) = handlers.get_mut(id)
        {
            entry.state = state.clone();
        }
        match self.stores.handlers.get(id).await {
            Ok(Some(mut config)) => {
                config.state = state.clone();
                if let Err(err) = self.stores.handlers.save(config).await {
                    warn!(target: "mc.handler", handler = %id, error = %err, "handler_state_save_failed");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(target: "mc.handler", handler = %id, error = %err, "handler_state_load_failed");
            }
        }
        let event = Event::new(EventType::Update, ENTITY_HANDLER_STATE, id, &state);
        if let Err(err) = self.bus.publish(topics::EVENT_HANDLER, &event) {
            warn!(target: "mc.handler", handler = %id, error = %err, "state_publish_failed");
        }
    }
}

#[async_trait]
impl ResourceManager<HandlerConfig> for HandlerService {
    fn resource_type(&self) -> &str {
        RESOURCE_HANDLER
    }

    async fn list_configs(&self) -> Result<Vec<HandlerConfig>, ResourceError> {
        Ok(self.shared.stores.handlers.list().await?)
    }

    async fn get_config(&self, id: &str) -> Result<Option<HandlerConfig>, ResourceError> {
        Ok(self.shared.stores.handlers.get(id).await?)
    }

    async fn load(&self, config: HandlerConfig) -> Result<(), ResourceError> {
        let id = config.id.clone();
        self.unload(&id).await?;

        let ctx = HandlerContext {
            config,
            bus: self.shared.bus.clone(),
            scheduler: self.shared.scheduler.clone(),
            data_root: self.shared.data_root.clone(),
        };
        let started = match self.shared.registry.create(ctx) {
            Ok(handler) => handler.start().await.map(|()| handler),
            Err(err) => Err(err),
        };
        let handler = match started {
            Ok(handler) => handler,
            Err(err) => {
                self.shared
                    .set_state(&id, State::new(StatusType::Error, err.to_string()))
                    .await;
                return Err(ResourceError::Load(err.to_string()));
            }
        };

        let state = State::new(StatusType::Up, "started successfully");
        self.shared
            .handlers
            .write()
            .map_err(|_| ResourceError::Load("lock failed".to_string()))?
            .insert(
                id.clone(),
                Entry {
                    handler,
                    state: state.clone(),
                },
            );
        self.shared.set_state(&id, state).await;
        info!(target: "mc.handler", handler = %id, "handler_loaded");
        Ok(())
    }

    async fn unload(&self, id: &str) -> Result<(), ResourceError> {
        let entry = self
            .shared
            .handlers
            .write()
            .map_err(|_| ResourceError::Load("lock failed".to_string()))?
            .remove(id);
        let Some(entry) = entry else {
            return Ok(());
        };
        if let Err(err) = entry.handler.close().await {
            warn!(target: "mc.handler", handler = %id, error = %err, "handler_close_failed");
        }
        self.shared
            .set_state(id, State::new(StatusType::Down, "stopped by request"))
            .await;
        info!(target: "mc.handler", handler = %id, "handler_unloaded");
        Ok(())
    }

    fn loaded_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .shared
            .handlers
            .read()
            .map(|handlers| handlers.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    async fn disable(&self, id: &str) -> Result<(), ResourceError> {
        let mut config = self
            .shared
            .stores
            .handlers
            .get(id)
            .await?
            .ok_or_else(|| ResourceError::NotFound(id.to_string()))?;
        config.enabled = false;
        self.shared.stores.handlers.save(config).await?;
        self.unload(id).await
    }
}
