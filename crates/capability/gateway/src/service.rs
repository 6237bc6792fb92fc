use crate::error::GatewayError;
use crate::provider::{Provider, ProviderContext, ProviderRegistry, RawSink};
use crate::sleeping::SleepingQueue;
use domain::{
    Event, EventType, GatewayConfig, Message, RawMessage, State, StatusType, topics,
};
use mc_bus::{Bus, SubscriptionId};
use mc_queue::{BoundedQueue, QueueConfig, QueueError, consumer_fn};
use mc_scheduler::Scheduler;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 下行消息队列容量。
pub const MESSAGE_QUEUE_CAPACITY: usize = 200;
/// 原始消息队列容量。
pub const RAW_QUEUE_CAPACITY: usize = 200;

/// 网关状态事件中的实体类型。
const ENTITY_GATEWAY_STATE: &str = "gateway_state";

/// Provider 注册的调度任务名前缀，网关停止时统一清理。
pub fn job_prefix(gateway_id: &str) -> String {
    format!("gateway_{gateway_id}_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Running,
}

/// 消费者共享的只读部分。
struct Core {
    config: GatewayConfig,
    bus: Bus,
    provider: Arc<dyn Provider>,
    sleeping: SleepingQueue,
}

struct Running {
    subscription: SubscriptionId,
    message_queue: BoundedQueue<Message>,
    raw_queue: BoundedQueue<RawMessage>,
}

/// 单个网关：Provider + 下行队列 + 原始消息队列 + 休眠节点缓存。
#[derive(Clone)]
pub struct GatewayService {
    core: Arc<Core>,
    scheduler: Scheduler,
    running: Arc<Mutex<Option<Running>>>,
}

impl GatewayService {
    /// 解析 Provider 并回填默认值；不启动任何 I/O。
    pub fn new(
        mut config: GatewayConfig,
        registry: &ProviderRegistry,
        bus: Bus,
        scheduler: Scheduler,
    ) -> Result<Self, GatewayError> {
        config.apply_defaults();
        let provider = registry.create(ProviderContext {
            gateway: config.clone(),
            bus: bus.clone(),
            scheduler: scheduler.clone(),
        })?;
        Ok(Self::with_provider(config, provider, bus, scheduler))
    }

    pub fn with_provider(
        mut config: GatewayConfig,
        provider: Arc<dyn Provider>,
        bus: Bus,
        scheduler: Scheduler,
    ) -> Self {
        config.apply_defaults();
        Self {
            core: Arc::new(Core {
                config,
                bus,
                provider,
                sleeping: SleepingQueue::default(),
            }),
            scheduler,
            running: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> &str {
        &self.core.config.id
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.core.config
    }

    pub fn sleeping(&self) -> &SleepingQueue {
        &self.core.sleeping
    }

    pub async fn lifecycle(&self) -> LifecycleState {
        if self.running.lock().await.is_some() {
            LifecycleState::Running
        } else {
            LifecycleState::Stopped
        }
    }

    /// 创建两个队列、订阅 `message.to_provider.<id>` 并启动 Provider。
    ///
    /// Provider 启动失败时回滚已创建的队列与订阅，并发布 error 状态。
    pub async fn start(&self) -> Result<(), GatewayError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }
        let gateway_id = self.id().to_string();

        let core = Arc::clone(&self.core);
        let message_queue = BoundedQueue::new(
            QueueConfig::new(format!("gateway_message_{gateway_id}"), MESSAGE_QUEUE_CAPACITY, 1),
            Arc::new(consumer_fn(move |message: Message| {
                let core = Arc::clone(&core);
                async move {
                    core.handle_outgoing(message).await;
                    Ok::<(), QueueError>(())
                }
            })),
            {
                let gateway_id = gateway_id.clone();
                move |message: Message| {
                    warn!(target: "mc.gateway", gateway = %gateway_id, node = %message.node_id, "outgoing_message_dropped");
                }
            },
        );

        let core = Arc::clone(&self.core);
        let raw_queue = BoundedQueue::new(
            QueueConfig::new(format!("gateway_raw_{gateway_id}"), RAW_QUEUE_CAPACITY, 1),
            Arc::new(consumer_fn(move |raw: RawMessage| {
                let core = Arc::clone(&core);
                async move {
                    core.handle_raw(raw).await;
                    Ok::<(), QueueError>(())
                }
            })),
            {
                let gateway_id = gateway_id.clone();
                move |_raw: RawMessage| {
                    warn!(target: "mc.gateway", gateway = %gateway_id, "raw_message_dropped");
                }
            },
        );

        let producer = message_queue.clone();
        let subscribe_gateway = gateway_id.clone();
        let subscription = match self.core.bus.subscribe(
            &topics::to_provider(&gateway_id),
            move |data| match data.decode::<Message>() {
                Ok(message) => {
                    producer.produce(message);
                }
                Err(err) => {
                    warn!(target: "mc.gateway", gateway = %subscribe_gateway, error = %err, "outgoing_decode_failed");
                }
            },
        ) {
            Ok(subscription) => subscription,
            Err(err) => {
                message_queue.stop().await;
                raw_queue.stop().await;
                return Err(err.into());
            }
        };

        let raw_producer = raw_queue.clone();
        let sink: RawSink = Arc::new(move |raw: RawMessage| {
            if raw_producer.produce(raw) {
                Ok(())
            } else {
                Err(GatewayError::QueueFull(raw_producer.name().to_string()))
            }
        });

        if let Err(err) = self.core.provider.start(sink).await {
            error!(target: "mc.gateway", gateway = %gateway_id, provider = %self.core.provider.name(), error = %err, "provider_start_failed");
            let _ = self
                .core
                .bus
                .unsubscribe(&topics::to_provider(&gateway_id), subscription);
            message_queue.stop().await;
            raw_queue.stop().await;
            self.core
                .publish_state(State::new(StatusType::Error, err.to_string()));
            return Err(err);
        }

        *running = Some(Running {
            subscription,
            message_queue,
            raw_queue,
        });
        info!(target: "mc.gateway", gateway = %gateway_id, provider = %self.core.provider.name(), "gateway_started");
        self.core
            .publish_state(State::new(StatusType::Up, "started successfully"));
        Ok(())
    }

    /// 取消订阅、停止队列并关闭 Provider。重复调用为空操作。
    pub async fn stop(&self) -> Result<(), GatewayError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };
        let gateway_id = self.id().to_string();
        if let Err(err) = self
            .core
            .bus
            .unsubscribe(&topics::to_provider(&gateway_id), running.subscription)
        {
            warn!(target: "mc.gateway", gateway = %gateway_id, error = %err, "unsubscribe_failed");
        }
        running.message_queue.stop().await;
        running.raw_queue.stop().await;
        let removed = self.scheduler.remove_with_prefix(&job_prefix(&gateway_id));
        let closed = self.core.provider.close().await;
        if let Err(err) = &closed {
            warn!(target: "mc.gateway", gateway = %gateway_id, error = %err, "provider_close_failed");
        }
        info!(target: "mc.gateway", gateway = %gateway_id, jobs_removed = removed, "gateway_stopped");
        self.core
            .publish_state(State::new(StatusType::Down, "stopped by request"));
        closed
    }

    /// 直接提交下行消息（绕过总线）。
    pub async fn enqueue(&self, message: Message) -> Result<(), GatewayError> {
        let running = self.running.lock().await;
        let queue = running
            .as_ref()
            .map(|running| &running.message_queue)
            .ok_or_else(|| GatewayError::NotRunning(self.id().to_string()))?;
        if queue.produce(message) {
            Ok(())
        } else {
            Err(GatewayError::QueueFull(queue.name().to_string()))
        }
    }
}

impl Core {
    async fn handle_outgoing(&self, message: Message) {
        if message.is_awake() {
            self.flush_sleeping(&message.node_id).await;
            return;
        }
        if message.is_sleep_node {
            self.sleeping.add(message);
            return;
        }
        self.post(message, true).await;
    }

    async fn flush_sleeping(&self, node_id: &str) {
        let pending = self.sleeping.take(node_id);
        if pending.is_empty() {
            return;
        }
        debug!(target: "mc.gateway", gateway = %self.config.id, node = %node_id, count = pending.len(), "sleeping_queue_flush");
        for message in pending {
            self.post(message, false).await;
        }
    }

    async fn post(&self, message: Message, requeue_on_failure: bool) {
        if let Err(err) = self.provider.post(&message).await {
            warn!(
                target: "mc.gateway",
                gateway = %self.config.id,
                node = %message.node_id,
                error = %err,
                "provider_post_failed"
            );
            if requeue_on_failure && self.config.queue_failed_message {
                self.sleeping.add(message);
            }
        }
    }

    async fn handle_raw(&self, raw: RawMessage) {
        let messages = match self.provider.process_received(raw).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(target: "mc.gateway", gateway = %self.config.id, error = %err, "raw_message_decode_failed");
                return;
            }
        };
        for mut message in messages {
            if message.gateway_id.is_empty() {
                message.gateway_id = self.config.id.clone();
            }
            if let Err(err) = self.bus.publish(topics::MESSAGE_TO_SERVER, &message) {
                warn!(target: "mc.gateway", gateway = %self.config.id, error = %err, "message_publish_failed");
            }
        }
    }

    fn publish_state(&self, state: State) {
        let event = Event::new(
            EventType::Update,
            ENTITY_GATEWAY_STATE,
            self.config.id.clone(),
            &state,
        );
        if let Err(err) = self.bus.publish(topics::EVENT_GATEWAY, &event) {
            warn!(target: "mc.gateway", gateway = %self.config.id, error = %err, "state_publish_failed");
        }
    }
}
